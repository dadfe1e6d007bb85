//! Reply handling shared by the LNURL-pay jobs.
use anyhow::anyhow;
use api_types::lnurl::LnurlErrorResponse;
use rpc_types::error::ErrorCode;
use runtime::constants::{
    DEFAULT_LNURL_PAY_NOTIFICATION_FAILURE_TITLE, LNURL_PAY_NOTIFICATION_FAILURE_TITLE,
};
use serde::Serialize;
use tracing::{debug, warn};

use crate::JobOutcome;

pub(crate) struct LnurlPayTitles {
    pub success: String,
    pub failure: String,
}

impl LnurlPayTitles {
    pub fn new(outcome: &JobOutcome, success_key: &str, success_default: &str) -> Self {
        let runtime = outcome.runtime();
        Self {
            success: runtime.resource(success_key, success_default),
            failure: runtime.resource(
                LNURL_PAY_NOTIFICATION_FAILURE_TITLE,
                DEFAULT_LNURL_PAY_NOTIFICATION_FAILURE_TITLE,
            ),
        }
    }
}

/// POSTs `body` to the LNURL server. A 200 response completes the job, any
/// other response or transport error fails it.
pub(crate) async fn reply<T: Serialize>(
    outcome: &JobOutcome,
    titles: &LnurlPayTitles,
    reply_url: &str,
    body: &T,
) -> anyhow::Result<()> {
    if outcome.is_terminal() {
        debug!(job_id = %outcome.id(), "job already resolved, not replying");
        return Ok(());
    }
    match outcome
        .runtime()
        .lnurl_api
        .reply(reply_url, body)
        .await
    {
        Ok(200) => {
            outcome.complete(titles.success.clone());
            Ok(())
        }
        Ok(status) => {
            outcome.fail(titles.failure.clone());
            Err(anyhow!(ErrorCode::ReplyFailed(status)))
        }
        Err(err) => {
            outcome.fail(titles.failure.clone());
            Err(anyhow::Error::new(err).context("failed to reply to lnurl server"))
        }
    }
}

/// Tells the LNURL server the request can't be served and fails the job. The
/// job fails whatever the server answers.
pub(crate) async fn fail_with_reply(
    outcome: &JobOutcome,
    titles: &LnurlPayTitles,
    reply_url: &str,
    error: anyhow::Error,
) -> anyhow::Result<()> {
    if !outcome.is_terminal() {
        let body = LnurlErrorResponse::new(error.to_string());
        match outcome.runtime().lnurl_api.reply(reply_url, &body).await {
            Ok(status) => debug!(job_id = %outcome.id(), status, "sent lnurl error reply"),
            Err(err) => {
                warn!(job_id = %outcome.id(), %err, "failed to send lnurl error reply")
            }
        }
    }
    outcome.fail(titles.failure.clone());
    Err(error)
}
