use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub enum ErrorCode {
    #[error("Initialization failed")]
    InitializationFailed,
    #[error("Not initialized")]
    NotInitialized,
    #[error("Invalid or unrecognized push message")]
    InvalidMessage,
    #[error("Missing connect request")]
    MissingConnectRequest,
    #[error("Node connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
    #[error("Invalid amount requested {0}")]
    InvalidAmount(#[ts(type = "number")] u64),
    #[error("Minimum sendable amount {min} exceeds maximum {max}")]
    InvalidSendableRange {
        #[ts(type = "number")]
        min: u64,
        #[ts(type = "number")]
        max: u64,
    },
    #[error("LNURL server replied with status {0}")]
    ReplyFailed(u16),
    #[error("Job was shut down before completing")]
    ForcedShutdown,
    #[error("Job panicked")]
    Panic,
}

#[derive(Debug, Serialize, Deserialize, TS, Clone)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RpcError {
    pub error: String,
    pub detail: String,
    pub error_code: Option<ErrorCode>,
}

impl RpcError {
    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        Self {
            error: err.to_string(),
            detail: format!("{err:?}"),
            error_code: get_error_code(err),
        }
    }
}

pub fn get_error_code(err: &anyhow::Error) -> Option<ErrorCode> {
    err.downcast_ref().cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_can_add_error() {
        let err = anyhow::anyhow!("node unreachable")
            .context(ErrorCode::ConnectionFailed("node unreachable".into()));
        let code = get_error_code(&err);
        assert_eq!(
            code,
            Some(ErrorCode::ConnectionFailed("node unreachable".into()))
        );
    }

    #[test]
    fn test_just_error_code() {
        let err = anyhow::anyhow!(ErrorCode::InvalidAmount(500));
        let code = get_error_code(&err);
        assert_eq!(code, Some(ErrorCode::InvalidAmount(500)));
        assert_eq!(err.to_string(), "Invalid amount requested 500");
    }

    #[test]
    fn test_rpc_error_without_code() {
        let err = anyhow::anyhow!("boom");
        let rpc_error = RpcError::from_anyhow(&err);
        assert_eq!(rpc_error.error, "boom");
        assert_eq!(rpc_error.error_code, None);
    }
}
