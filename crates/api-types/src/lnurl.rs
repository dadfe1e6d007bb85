use serde::{Deserialize, Serialize};

// push payloads, as sent by the notification server inside
// `notification_payload`

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LnurlPayInfoRequest {
    pub callback_url: String,
    pub reply_url: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LnurlPayInvoiceRequest {
    pub reply_url: String,
    pub amount: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AddressTxsConfirmedRequest {
    pub address: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct PaymentReceivedRequest {
    #[serde(default)]
    pub payment_hash: Option<String>,
}

// replies POSTed back to the LNURL server at `reply_url`

pub const LNURL_ERROR_STATUS: &str = "ERROR";
pub const LNURL_PAY_REQUEST_TAG: &str = "payRequest";

/// LUD-06 `payRequest` response, relayed through the notification server.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LnurlPayInfoResponse {
    pub callback: String,
    pub max_sendable: u64,
    pub min_sendable: u64,
    pub metadata: String,
    pub tag: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LnurlInvoiceResponse {
    pub pr: String,
    pub routes: Vec<String>,
}

impl LnurlInvoiceResponse {
    pub fn new(pr: String) -> Self {
        Self { pr, routes: vec![] }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LnurlErrorResponse {
    pub status: String,
    pub reason: String,
}

impl LnurlErrorResponse {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            status: LNURL_ERROR_STATUS.to_owned(),
            reason: reason.into(),
        }
    }
}

/// Builds the LUD-06 metadata array holding a single `text/plain` entry.
pub fn plain_text_metadata(text: &str) -> String {
    serde_json::json!([["text/plain", text]]).to_string()
}
