//! Units of work triggered by a push message.
//!
//! A job is created from a decoded [`NotificationMessage`], started once the
//! node connection is available and fed node events while it runs. Whatever
//! happens (success, failure, forced shutdown), the job reports exactly one
//! outcome to the host through its [`JobOutcome`].
use std::sync::Arc;

use async_trait::async_trait;
use rpc_types::{NotificationMessage, NotificationType, RpcJobId};
use runtime::bridge_runtime::Runtime;
use runtime::config::ServiceConfig;
use runtime::node::{NodeConnection, NodeEvent};
use serde::Serialize;

pub use confirm_transaction::ConfirmTransactionJob;
pub use lnurl_pay_info::LnurlPayInfoJob;
pub use lnurl_pay_invoice::LnurlPayInvoiceJob;
pub use outcome::JobOutcome;
pub use receive_payment::ReceivePaymentJob;

pub mod confirm_transaction;
mod lnurl_pay;
pub mod lnurl_pay_info;
pub mod lnurl_pay_invoice;
pub mod outcome;
pub mod receive_payment;

pub type JobId = RpcJobId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum JobState {
    Created,
    Running,
    Completed,
    Failed,
    ShutdownForced,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::Failed | JobState::ShutdownForced
        )
    }
}

#[async_trait]
pub trait Job: Send + Sync + 'static {
    fn id(&self) -> JobId;

    fn kind(&self) -> NotificationType;

    fn state(&self) -> JobState;

    /// Moves the job to `Running` before the service registers it. Returns
    /// false when the job already resolved and must not be started.
    fn mark_running(&self) -> bool;

    /// Performs the job's work. Event driven jobs keep this future pending
    /// until the job resolves. An error is returned after the job already
    /// reported its failure.
    async fn start(&self, node: NodeConnection) -> anyhow::Result<()>;

    /// Node event delivered while the job is registered. Must not block.
    fn on_event(&self, event: &NodeEvent);

    /// The service is going away. Reports a failure unless the job already
    /// resolved, without any network call.
    fn on_shutdown(&self);

    /// The job could not be started, e.g. the node is unreachable. Reports a
    /// failure unless the job already resolved.
    fn on_start_failed(&self);
}

/// Everything a job needs when it is built.
pub struct JobContext {
    pub id: JobId,
    pub message: NotificationMessage,
    pub runtime: Arc<Runtime>,
    /// Config current when the message arrived
    pub config: Arc<ServiceConfig>,
}

pub trait JobFactory: Send + Sync + 'static {
    /// Returns `None` when no job handles the message.
    fn create_job(&self, ctx: JobContext) -> Option<Arc<dyn Job>>;
}

/// Maps every notification type to its built-in job.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultJobFactory;

impl JobFactory for DefaultJobFactory {
    fn create_job(&self, ctx: JobContext) -> Option<Arc<dyn Job>> {
        let job: Arc<dyn Job> = match ctx.message.notification_type {
            NotificationType::AddressTxsConfirmed => Arc::new(ConfirmTransactionJob::new(ctx)),
            NotificationType::LnurlPayInfo => Arc::new(LnurlPayInfoJob::new(ctx)),
            NotificationType::LnurlPayInvoice => Arc::new(LnurlPayInvoiceJob::new(ctx)),
            NotificationType::PaymentReceived => Arc::new(ReceivePaymentJob::new(ctx)),
        };
        Some(job)
    }
}

#[cfg(test)]
pub(crate) mod test_utils {
    use std::sync::Arc;

    use rpc_types::{NotificationMessage, NotificationType, RpcJobId};
    use runtime::bridge_runtime::Runtime;
    use runtime::config::ServiceConfig;
    use runtime::test_device::{test_runtime, MockLnurlApi, TestEventSink};

    use crate::JobContext;

    pub struct TestEnv {
        pub sink: Arc<TestEventSink>,
        pub lnurl_api: Arc<MockLnurlApi>,
        pub runtime: Arc<Runtime>,
    }

    impl TestEnv {
        pub fn new() -> Self {
            Self::with_lnurl_api(MockLnurlApi::default())
        }

        pub fn with_lnurl_api(lnurl_api: MockLnurlApi) -> Self {
            let sink = Arc::new(TestEventSink::default());
            let lnurl_api = Arc::new(lnurl_api);
            let runtime = test_runtime(sink.clone(), lnurl_api.clone());
            Self {
                sink,
                lnurl_api,
                runtime,
            }
        }

        pub fn context(
            &self,
            notification_type: NotificationType,
            payload: &str,
            config: ServiceConfig,
        ) -> JobContext {
            JobContext {
                id: RpcJobId(1),
                message: NotificationMessage {
                    notification_type,
                    payload: payload.to_owned(),
                },
                runtime: self.runtime.clone(),
                config: Arc::new(config),
            }
        }

        /// `(title, success)` of every notification emitted so far.
        pub fn notifications(&self) -> Vec<(String, bool)> {
            self.sink
                .bodies_of_type("notification")
                .into_iter()
                .map(|body| {
                    (
                        body["title"].as_str().unwrap_or_default().to_owned(),
                        body["success"].as_bool().unwrap_or_default(),
                    )
                })
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use runtime::config::ServiceConfig;

    use super::test_utils::TestEnv;
    use super::*;

    #[test]
    fn test_default_factory_builds_matching_kind() {
        let env = TestEnv::new();
        for kind in [
            NotificationType::AddressTxsConfirmed,
            NotificationType::LnurlPayInfo,
            NotificationType::LnurlPayInvoice,
            NotificationType::PaymentReceived,
        ] {
            let job = DefaultJobFactory
                .create_job(env.context(kind, "{}", ServiceConfig::default()))
                .unwrap();
            assert_eq!(job.kind(), kind);
            assert_eq!(job.state(), JobState::Created);
            assert_eq!(job.id(), RpcJobId(1));
        }
    }

    #[test]
    fn test_terminal_states() {
        assert!(!JobState::Created.is_terminal());
        assert!(!JobState::Running.is_terminal());
        assert!(JobState::Completed.is_terminal());
        assert!(JobState::Failed.is_terminal());
        assert!(JobState::ShutdownForced.is_terminal());
    }
}
