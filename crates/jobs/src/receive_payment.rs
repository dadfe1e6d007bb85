use api_types::lnurl::PaymentReceivedRequest;
use async_trait::async_trait;
use rpc_types::NotificationType;
use runtime::constants::{
    DEFAULT_PAYMENT_RECEIVED_NOTIFICATION_FAILURE_TITLE,
    DEFAULT_PAYMENT_RECEIVED_NOTIFICATION_TITLE, PAYMENT_RECEIVED_NOTIFICATION_FAILURE_TITLE,
    PAYMENT_RECEIVED_NOTIFICATION_TITLE,
};
use runtime::node::{NodeConnection, NodeEvent, PaymentStatus};
use runtime::resources::format_amount;
use runtime::utils::msat_to_sat;
use tracing::{debug, info, warn};

use crate::{Job, JobContext, JobId, JobOutcome, JobState};

/// Waits for an incoming payment and shows how much arrived.
///
/// The payload may name the payment hash. Without one, the first paid
/// invoice resolves the job.
pub struct ReceivePaymentJob {
    outcome: JobOutcome,
    payment_hash: Option<String>,
    success_template: String,
    failure_title: String,
}

impl ReceivePaymentJob {
    pub fn new(ctx: JobContext) -> Self {
        let payment_hash = match serde_json::from_str::<PaymentReceivedRequest>(&ctx.message.payload)
        {
            Ok(request) => request.payment_hash,
            Err(err) => {
                // the node event alone is enough to resolve this job
                debug!(job_id = %ctx.id, %err, "payment received payload has no usable hash");
                None
            }
        };
        let success_template = ctx.runtime.resource(
            PAYMENT_RECEIVED_NOTIFICATION_TITLE,
            DEFAULT_PAYMENT_RECEIVED_NOTIFICATION_TITLE,
        );
        let failure_title = ctx.runtime.resource(
            PAYMENT_RECEIVED_NOTIFICATION_FAILURE_TITLE,
            DEFAULT_PAYMENT_RECEIVED_NOTIFICATION_FAILURE_TITLE,
        );
        Self {
            outcome: JobOutcome::new(ctx.id, NotificationType::PaymentReceived, ctx.runtime),
            payment_hash,
            success_template,
            failure_title,
        }
    }

    fn received(&self, amount_msat: u64) {
        let title = format_amount(&self.success_template, msat_to_sat(amount_msat));
        self.outcome.complete(title);
    }

    fn matches(&self, payment_hash: &str) -> bool {
        self.payment_hash
            .as_deref()
            .map_or(true, |expected| expected == payment_hash)
    }
}

#[async_trait]
impl Job for ReceivePaymentJob {
    fn id(&self) -> JobId {
        self.outcome.id()
    }

    fn kind(&self) -> NotificationType {
        NotificationType::PaymentReceived
    }

    fn state(&self) -> JobState {
        self.outcome.state()
    }

    fn mark_running(&self) -> bool {
        self.outcome.mark_running()
    }

    async fn start(&self, node: NodeConnection) -> anyhow::Result<()> {
        if !self.outcome.mark_running() {
            return Ok(());
        }
        // the payment may have settled while we were connecting
        if let Some(payment_hash) = &self.payment_hash {
            match node.payment_by_hash(payment_hash.clone()).await {
                Ok(Some(payment)) if payment.status == PaymentStatus::Complete => {
                    info!(job_id = %self.outcome.id(), %payment_hash, "payment already received");
                    self.received(payment.amount_msat);
                }
                Ok(_) => {}
                Err(err) => {
                    warn!(job_id = %self.outcome.id(), %payment_hash, %err, "failed to look up payment");
                }
            }
        }
        let state = self.outcome.wait_terminal().await;
        debug!(job_id = %self.outcome.id(), ?state, "receive payment job done");
        Ok(())
    }

    fn on_event(&self, event: &NodeEvent) {
        let NodeEvent::InvoicePaid { details } = event else {
            return;
        };
        if !self.matches(&details.payment_hash) {
            debug!(job_id = %self.outcome.id(), payment_hash = %details.payment_hash, "ignoring unrelated payment");
            return;
        }
        let amount_msat = details
            .payment
            .as_ref()
            .map(|payment| payment.amount_msat)
            .unwrap_or_default();
        self.received(amount_msat);
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
    use std::time::Duration;

    use runtime::config::ServiceConfig;
    use runtime::node::{InvoicePaidDetails, Payment};
    use runtime::test_device::{MockNodeService, TEST_BOLT11};

    use super::*;
    use crate::test_utils::TestEnv;

    fn payment(payment_hash: &str, amount_msat: u64, status: PaymentStatus) -> Payment {
        Payment {
            payment_hash: payment_hash.to_owned(),
            amount_msat,
            fee_msat: 0,
            status,
            description: None,
        }
    }

    fn invoice_paid(payment_hash: &str, amount_msat: u64) -> NodeEvent {
        NodeEvent::InvoicePaid {
            details: InvoicePaidDetails {
                payment_hash: payment_hash.to_owned(),
                bolt11: TEST_BOLT11.to_owned(),
                payment: Some(payment(payment_hash, amount_msat, PaymentStatus::Complete)),
            },
        }
    }

    fn receive_job(env: &TestEnv, payload: &str) -> Arc<ReceivePaymentJob> {
        Arc::new(ReceivePaymentJob::new(env.context(
            NotificationType::PaymentReceived,
            payload,
            ServiceConfig::default(),
        )))
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolves_on_matching_event() {
        let env = TestEnv::new();
        let job = receive_job(&env, r#"{"payment_hash": "aa"}"#);
        let task = tokio::spawn({
            let job = job.clone();
            let node: NodeConnection = Arc::new(MockNodeService::default());
            async move { job.start(node).await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(job.state(), JobState::Running);

        job.on_event(&NodeEvent::Synced);
        job.on_event(&invoice_paid("bb", 1_000_000));
        assert_eq!(job.state(), JobState::Running);

        job.on_event(&invoice_paid("aa", 5_000_999));
        job.on_event(&invoice_paid("aa", 5_000_999));
        task.await.unwrap().unwrap();

        assert_eq!(job.state(), JobState::Completed);
        assert_eq!(env.notifications(), vec![("Received 5000 sats".to_owned(), true)]);
    }

    #[tokio::test]
    async fn test_already_received_payment() -> anyhow::Result<()> {
        let env = TestEnv::new();
        let node = Arc::new(MockNodeService::default());
        node.payments.lock().unwrap().insert(
            "aa".to_owned(),
            payment("aa", 21_000, PaymentStatus::Complete),
        );
        let job = receive_job(&env, r#"{"payment_hash": "aa"}"#);

        job.start(node).await?;

        assert_eq!(env.notifications(), vec![("Received 21 sats".to_owned(), true)]);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_payment_waits_for_shutdown() {
        let env = TestEnv::new();
        let node = Arc::new(MockNodeService::default());
        node.payments.lock().unwrap().insert(
            "aa".to_owned(),
            payment("aa", 21_000, PaymentStatus::Pending),
        );
        let job = receive_job(&env, r#"{"payment_hash": "aa"}"#);
        let task = tokio::spawn({
            let job = job.clone();
            let node: NodeConnection = node;
            async move { job.start(node).await }
        });
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(!task.is_finished());

        job.on_shutdown();
        task.await.unwrap().unwrap();
        assert_eq!(job.state(), JobState::ShutdownForced);
        assert_eq!(env.notifications(), vec![("Receive Payment Failed".to_owned(), false)]);
    }

    #[test]
    fn test_any_payment_without_hash() {
        let env = TestEnv::new();
        let job = receive_job(&env, "{}");
        job.on_event(&invoice_paid("cc", 2_000));
        assert_eq!(job.state(), JobState::Completed);
        assert_eq!(env.notifications(), vec![("Received 2 sats".to_owned(), true)]);
    }
}
