use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_AUTO_CHANNEL_SETUP_FEE_LIMIT_MSAT, DEFAULT_SERVICE_TIMEOUT, DEFAULT_SHUTDOWN_DELAY,
};

/// Policy values for one service invocation. Hosts may override any subset
/// of the fields; the rest fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceConfig {
    /// Highest channel-open fee we accept when an LNURL payer requests an
    /// invoice. A fee of zero is always accepted.
    pub auto_channel_setup_fee_limit_msat: u64,
    /// After this long every job still running is shut down and the service
    /// exits.
    pub service_timeout_ms: u64,
    /// How long the service lingers once no job is running, in case another
    /// message arrives.
    pub shutdown_delay_ms: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            auto_channel_setup_fee_limit_msat: DEFAULT_AUTO_CHANNEL_SETUP_FEE_LIMIT_MSAT,
            service_timeout_ms: DEFAULT_SERVICE_TIMEOUT.as_millis() as u64,
            shutdown_delay_ms: DEFAULT_SHUTDOWN_DELAY.as_millis() as u64,
        }
    }
}

impl ServiceConfig {
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("invalid service config")
    }

    pub fn service_timeout(&self) -> Duration {
        Duration::from_millis(self.service_timeout_ms)
    }

    pub fn shutdown_delay(&self) -> Duration {
        Duration::from_millis(self.shutdown_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() -> anyhow::Result<()> {
        let config = ServiceConfig::from_json(r#"{"autoChannelSetupFeeLimitMsat": 5000}"#)?;
        assert_eq!(config.auto_channel_setup_fee_limit_msat, 5000);
        assert_eq!(config.service_timeout(), DEFAULT_SERVICE_TIMEOUT);
        assert_eq!(config.shutdown_delay(), DEFAULT_SHUTDOWN_DELAY);
        Ok(())
    }

    #[test]
    fn test_empty_config_is_default() -> anyhow::Result<()> {
        assert_eq!(ServiceConfig::from_json("{}")?, ServiceConfig::default());
        Ok(())
    }

    #[test]
    fn test_invalid_config() {
        assert!(ServiceConfig::from_json(r#"{"serviceTimeoutMs": "soon"}"#).is_err());
    }
}
