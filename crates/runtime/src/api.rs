use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use crate::constants::LNURL_REPLY_TIMEOUT;

/// Represents the different errors we might encounter when replying to the
/// LNURL server. An HTTP response, whatever its status code, is not an error
/// at this level; callers decide what a non-200 status means.
#[derive(Debug, thiserror::Error)]
pub enum LnurlReplyError {
    /// The reply URL received in the push payload can't be used.
    #[error("Invalid reply url {0}")]
    InvalidUrl(String),

    /// Variant representing errors encountered while sending the request to
    /// the server.
    #[error("Error sending request {0}")]
    ErrorSendingRequest(String),

    /// No response was received from the server within the allotted time.
    #[error("Request timed out")]
    RequestTimeout,
}

/// Trait that represents the API for answering LNURL servers.
#[async_trait]
pub trait ILnurlApi: Send + Sync + 'static {
    /// POSTs `body` as JSON to `url` and returns the HTTP status code.
    async fn post_json(&self, url: &str, body: serde_json::Value)
        -> Result<u16, LnurlReplyError>;
}

impl dyn ILnurlApi {
    pub async fn reply<T: Serialize>(&self, url: &str, body: &T) -> Result<u16, LnurlReplyError> {
        let body = serde_json::to_value(body).expect("reply types always serialize");
        self.post_json(url, body).await
    }
}

/// Live code implementation of the ILnurlApi trait that uses a real
/// reqwest::Client to call out to LNURL servers
pub struct LiveLnurlApi {
    client: Client,
}

impl LiveLnurlApi {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }
}

impl Default for LiveLnurlApi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ILnurlApi for LiveLnurlApi {
    async fn post_json(
        &self,
        url: &str,
        body: serde_json::Value,
    ) -> Result<u16, LnurlReplyError> {
        let url =
            reqwest::Url::parse(url).map_err(|e| LnurlReplyError::InvalidUrl(e.to_string()))?;

        let timeout_res = tokio::time::timeout(LNURL_REPLY_TIMEOUT, async {
            self.client.post(url.clone()).json(&body).send().await
        })
        .await;

        let Ok(reply_result) = timeout_res else {
            return Err(LnurlReplyError::RequestTimeout);
        };

        match reply_result {
            Ok(resp) => {
                let status = resp.status().as_u16();
                debug!(%url, status, "lnurl server replied");
                Ok(status)
            }
            Err(e) => Err(LnurlReplyError::ErrorSendingRequest(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use api_types::lnurl::LnurlErrorResponse;
    use mockito::Matcher;

    use super::*;

    #[tokio::test]
    async fn test_post_json_returns_status() -> anyhow::Result<()> {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/reply")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(serde_json::json!({
                "status": "ERROR",
                "reason": "nope"
            })))
            .with_status(200)
            .create_async()
            .await;

        let api: Arc<dyn ILnurlApi> = Arc::new(LiveLnurlApi::new());
        let status = api
            .reply(
                &format!("{}/reply", server.url()),
                &LnurlErrorResponse::new("nope"),
            )
            .await?;
        assert_eq!(status, 200);
        mock.assert_async().await;
        Ok(())
    }

    #[tokio::test]
    async fn test_non_200_is_not_an_error() -> anyhow::Result<()> {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/reply")
            .with_status(404)
            .create_async()
            .await;

        let api = LiveLnurlApi::new();
        let status = api
            .post_json(&format!("{}/reply", server.url()), serde_json::json!({}))
            .await?;
        assert_eq!(status, 404);
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_url() {
        let api = LiveLnurlApi::new();
        let res = api.post_json("not a url", serde_json::json!({})).await;
        assert!(matches!(res, Err(LnurlReplyError::InvalidUrl(_))));
    }
}
