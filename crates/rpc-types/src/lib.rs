use std::collections::BTreeMap;
use std::fmt;

use runtime::config::ServiceConfig;
use runtime::node::ConnectRequest;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

pub mod error;
pub mod event;
pub mod notification;

pub use notification::{NotificationMessage, NotificationType};

/// Options the host passes when the notification service is created.
#[derive(Debug, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RpcInitOpts {
    pub data_dir: Option<String>,
    pub log_level: Option<String>,
    #[ts(type = "unknown")]
    pub service_config: Option<ServiceConfig>,
    #[ts(type = "unknown")]
    pub connect_request: Option<ConnectRequest>,
    /// Localized strings, keyed by resource identifier
    #[serde(default)]
    pub resources: BTreeMap<String, String>,
}

/// Identifies a job within one process lifetime.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct RpcJobId(#[ts(type = "number")] pub u64);

impl fmt::Display for RpcJobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_opts_minimal() -> anyhow::Result<()> {
        let opts: RpcInitOpts = serde_json::from_str(r#"{"dataDir": "/tmp/notify"}"#)?;
        assert_eq!(opts.data_dir.as_deref(), Some("/tmp/notify"));
        assert!(opts.service_config.is_none());
        assert!(opts.connect_request.is_none());
        assert!(opts.resources.is_empty());
        Ok(())
    }

    #[test]
    fn test_init_opts_full() -> anyhow::Result<()> {
        let opts: RpcInitOpts = serde_json::from_str(
            r#"{
                "dataDir": null,
                "logLevel": "debug",
                "serviceConfig": {"autoChannelSetupFeeLimitMsat": 5000},
                "connectRequest": {"config": {"apiKey": "k"}, "seed": [1, 2, 3]},
                "resources": {"lnurl_pay_metadata_plain_text": "Pay me"}
            }"#,
        )?;
        assert_eq!(
            opts.service_config.map(|c| c.auto_channel_setup_fee_limit_msat),
            Some(5000)
        );
        assert_eq!(opts.connect_request.map(|c| c.seed), Some(vec![1, 2, 3]));
        assert_eq!(opts.resources.len(), 1);
        Ok(())
    }
}
