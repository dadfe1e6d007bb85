//! Second LNURL-pay step: the payer picked an amount, we quote the channel
//! fee, check it against the configured limit and hand back an invoice.
use std::sync::Arc;

use anyhow::anyhow;
use api_types::lnurl::{plain_text_metadata, LnurlInvoiceResponse, LnurlPayInvoiceRequest};
use async_trait::async_trait;
use rpc_types::error::ErrorCode;
use rpc_types::NotificationType;
use runtime::config::ServiceConfig;
use runtime::constants::{
    DEFAULT_LNURL_PAY_INVOICE_NOTIFICATION_TITLE, DEFAULT_LNURL_PAY_METADATA_PLAIN_TEXT,
    LNURL_PAY_INVOICE_NOTIFICATION_TITLE, LNURL_PAY_METADATA_PLAIN_TEXT, MIN_RECEIVABLE_MSAT,
};
use runtime::node::{
    NodeConnection, NodeEvent, OpenChannelFeeRequest, OpenChannelFeeResponse,
    ReceivePaymentRequest,
};
use tracing::{info, warn};

use crate::lnurl_pay::{fail_with_reply, reply, LnurlPayTitles};
use crate::{Job, JobContext, JobId, JobOutcome, JobState};

pub struct LnurlPayInvoiceJob {
    outcome: JobOutcome,
    titles: LnurlPayTitles,
    payload: String,
    config: Arc<ServiceConfig>,
}

impl LnurlPayInvoiceJob {
    pub fn new(ctx: JobContext) -> Self {
        let outcome = JobOutcome::new(ctx.id, NotificationType::LnurlPayInvoice, ctx.runtime);
        let titles = LnurlPayTitles::new(
            &outcome,
            LNURL_PAY_INVOICE_NOTIFICATION_TITLE,
            DEFAULT_LNURL_PAY_INVOICE_NOTIFICATION_TITLE,
        );
        Self {
            outcome,
            titles,
            payload: ctx.message.payload,
            config: ctx.config,
        }
    }

    async fn create_invoice(
        &self,
        node: &NodeConnection,
        request: &LnurlPayInvoiceRequest,
    ) -> anyhow::Result<String> {
        let quote = node
            .open_channel_fee(OpenChannelFeeRequest {
                amount_msat: Some(request.amount),
                expiry: None,
            })
            .await?;
        check_amount(request.amount, &quote, &self.config)?;

        let metadata = self.outcome.runtime().resource(
            LNURL_PAY_METADATA_PLAIN_TEXT,
            DEFAULT_LNURL_PAY_METADATA_PLAIN_TEXT,
        );
        if self.outcome.is_terminal() {
            return Err(anyhow!(ErrorCode::ForcedShutdown));
        }
        let response = node
            .receive_payment(ReceivePaymentRequest {
                amount_msat: request.amount,
                description: plain_text_metadata(&metadata),
                use_description_hash: true,
                opening_fee_params: Some(quote.fee_params),
            })
            .await?;
        info!(
            job_id = %self.outcome.id(),
            amount_msat = request.amount,
            fee_msat = quote.fee_msat,
            payment_hash = %response.ln_invoice.payment_hash,
            "created invoice for lnurl payer"
        );
        Ok(response.ln_invoice.bolt11)
    }
}

/// Rejects the amount when it is below what the LSP accepts or when opening
/// the channel costs more than the configured limit. A zero fee means the
/// payment fits into existing inbound liquidity.
pub fn check_amount(
    amount_msat: u64,
    quote: &OpenChannelFeeResponse,
    config: &ServiceConfig,
) -> Result<(), ErrorCode> {
    let fee_msat = quote.fee_msat;
    let is_fee_within_limits = fee_msat == 0 || fee_msat <= config.auto_channel_setup_fee_limit_msat;
    let min_acceptable_msat = if fee_msat == 0 {
        MIN_RECEIVABLE_MSAT
    } else {
        quote.fee_params.min_msat
    };
    if amount_msat < min_acceptable_msat || !is_fee_within_limits {
        return Err(ErrorCode::InvalidAmount(amount_msat));
    }
    Ok(())
}

#[async_trait]
impl Job for LnurlPayInvoiceJob {
    fn id(&self) -> JobId {
        self.outcome.id()
    }

    fn kind(&self) -> NotificationType {
        NotificationType::LnurlPayInvoice
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
        let request: LnurlPayInvoiceRequest = match serde_json::from_str(&self.payload) {
            Ok(request) => request,
            Err(err) => {
                warn!(job_id = %self.outcome.id(), %err, "failed to decode lnurl invoice payload");
                self.outcome.fail(self.titles.failure.clone());
                return Err(anyhow!(ErrorCode::InvalidPayload(err.to_string())));
            }
        };

        match self.create_invoice(&node, &request).await {
            Ok(bolt11) => {
                reply(
                    &self.outcome,
                    &self.titles,
                    &request.reply_url,
                    &LnurlInvoiceResponse::new(bolt11),
                )
                .await
            }
            Err(err) => fail_with_reply(&self.outcome, &self.titles, &request.reply_url, err).await,
        }
    }

    fn on_event(&self, _event: &NodeEvent) {}

    fn on_shutdown(&self) {
        self.outcome.force_shutdown(self.titles.failure.clone());
    }

    fn on_start_failed(&self) {
        self.outcome.fail(self.titles.failure.clone());
    }
}
