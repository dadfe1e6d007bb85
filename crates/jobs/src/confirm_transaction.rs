use anyhow::anyhow;
use api_types::lnurl::AddressTxsConfirmedRequest;
use async_trait::async_trait;
use rpc_types::error::ErrorCode;
use rpc_types::NotificationType;
use runtime::constants::{
    DEFAULT_SWAP_TX_CONFIRMED_NOTIFICATION_FAILURE_TITLE,
    DEFAULT_SWAP_TX_CONFIRMED_NOTIFICATION_TITLE, SWAP_TX_CONFIRMED_NOTIFICATION_FAILURE_TITLE,
    SWAP_TX_CONFIRMED_NOTIFICATION_TITLE,
};
use runtime::node::{NodeConnection, NodeEvent};
use tracing::{debug, info, warn};

use crate::{Job, JobContext, JobId, JobOutcome, JobState};

/// Waits until the transactions paying to a swap address confirm.
pub struct ConfirmTransactionJob {
    outcome: JobOutcome,
    request: Result<AddressTxsConfirmedRequest, String>,
    success_title: String,
    failure_title: String,
}

impl ConfirmTransactionJob {
    pub fn new(ctx: JobContext) -> Self {
        let request = serde_json::from_str(&ctx.message.payload).map_err(|err| err.to_string());
        let success_title = ctx.runtime.resource(
            SWAP_TX_CONFIRMED_NOTIFICATION_TITLE,
            DEFAULT_SWAP_TX_CONFIRMED_NOTIFICATION_TITLE,
        );
        let failure_title = ctx.runtime.resource(
            SWAP_TX_CONFIRMED_NOTIFICATION_FAILURE_TITLE,
            DEFAULT_SWAP_TX_CONFIRMED_NOTIFICATION_FAILURE_TITLE,
        );
        Self {
            outcome: JobOutcome::new(ctx.id, NotificationType::AddressTxsConfirmed, ctx.runtime),
            request,
            success_title,
            failure_title,
        }
    }
}

#[async_trait]
impl Job for ConfirmTransactionJob {
    fn id(&self) -> JobId {
        self.outcome.id()
    }

    fn kind(&self) -> NotificationType {
        NotificationType::AddressTxsConfirmed
    }

    fn state(&self) -> JobState {
        self.outcome.state()
    }

    fn mark_running(&self) -> bool {
        self.outcome.mark_running()
    }

    async fn start(&self, _node: NodeConnection) -> anyhow::Result<()> {
        if !self.outcome.mark_running() {
            return Ok(());
        }
        let request = match &self.request {
            Ok(request) => request,
            Err(err) => {
                warn!(job_id = %self.outcome.id(), %err, "failed to decode address payload");
                self.outcome.fail(self.failure_title.clone());
                return Err(anyhow!(ErrorCode::InvalidPayload(err.clone())));
            }
        };
        debug!(job_id = %self.outcome.id(), address = %request.address, "waiting for confirmation");
        self.outcome.wait_terminal().await;
        Ok(())
    }

    fn on_event(&self, event: &NodeEvent) {
        let (NodeEvent::AddressTxsConfirmed { address }, Ok(request)) = (event, &self.request) else {
            return;
        };
        if *address == request.address {
            info!(job_id = %self.outcome.id(), %address, "swap transaction confirmed");
            self.outcome.complete(self.success_title.clone());
        }
    }

    fn on_shutdown(&self) {
        self.outcome.force_shutdown(self.failure_title.clone());
    }

    fn on_start_failed(&self) {
        self.outcome.fail(self.failure_title.clone());
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use runtime::config::ServiceConfig;
    use runtime::test_device::MockNodeService;

    use super::*;
    use crate::test_utils::TestEnv;

    fn confirm_job(env: &TestEnv, payload: &str) -> Arc<ConfirmTransactionJob> {
        Arc::new(ConfirmTransactionJob::new(env.context(
            NotificationType::AddressTxsConfirmed,
            payload,
            ServiceConfig::default(),
        )))
    }

    #[tokio::test]
    async fn test_confirms_matching_address() {
        let env = TestEnv::new();
        let job = confirm_job(&env, r#"{"address": "bc1qswap"}"#);
        let task = tokio::spawn({
            let job = job.clone();
            let node: NodeConnection = Arc::new(MockNodeService::default());
            async move { job.start(node).await }
        });
        while job.state() != JobState::Running {
            tokio::task::yield_now().await;
        }

        job.on_event(&NodeEvent::AddressTxsConfirmed {
            address: "bc1qother".into(),
        });
        job.on_event(&NodeEvent::NewBlock { block: 800_001 });
        assert_eq!(job.state(), JobState::Running);

        job.on_event(&NodeEvent::AddressTxsConfirmed {
            address: "bc1qswap".into(),
        });
        task.await.unwrap().unwrap();
        assert_eq!(env.notifications(), vec![("Swap Confirmed".to_owned(), true)]);
    }

    #[tokio::test]
    async fn test_malformed_payload_fails() {
        let env = TestEnv::new();
        let job = confirm_job(&env, r#"{"addr": 1}"#);
        assert!(job.start(Arc::new(MockNodeService::default())).await.is_err());
        assert_eq!(job.state(), JobState::Failed);
        assert_eq!(env.notifications(), vec![("Redeem Swap Failed".to_owned(), false)]);
    }

    #[test]
    fn test_shutdown_reports_failure_once() {
        let env = TestEnv::new();
        let job = confirm_job(&env, r#"{"address": "bc1qswap"}"#);
        job.on_shutdown();
        job.on_shutdown();
        job.on_event(&NodeEvent::AddressTxsConfirmed {
            address: "bc1qswap".into(),
        });
        assert_eq!(job.state(), JobState::ShutdownForced);
        assert_eq!(env.notifications(), vec![("Redeem Swap Failed".to_owned(), false)]);
    }

    #[test]
    fn test_start_failure_is_not_a_forced_shutdown() {
        let env = TestEnv::new();
        let job = confirm_job(&env, r#"{"address": "bc1qswap"}"#);
        job.on_start_failed();
        job.on_shutdown();
        assert!(!job.mark_running());
        assert_eq!(job.state(), JobState::Failed);
        assert_eq!(env.notifications(), vec![("Redeem Swap Failed".to_owned(), false)]);
    }
}
