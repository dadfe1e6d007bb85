//! First LNURL-pay step: tell the payer how much we can receive.
use anyhow::anyhow;
use api_types::lnurl::{
    plain_text_metadata, LnurlPayInfoRequest, LnurlPayInfoResponse, LNURL_PAY_REQUEST_TAG,
};
use async_trait::async_trait;
use rpc_types::error::ErrorCode;
use rpc_types::NotificationType;
use runtime::constants::{
    DEFAULT_LNURL_PAY_INFO_NOTIFICATION_TITLE, DEFAULT_LNURL_PAY_METADATA_PLAIN_TEXT,
    LNURL_PAY_INFO_NOTIFICATION_TITLE, LNURL_PAY_METADATA_PLAIN_TEXT, MIN_RECEIVABLE_MSAT,
};
use runtime::node::{NodeConnection, NodeEvent, NodeState, OpenChannelFeeRequest};
use tracing::{debug, warn};

use crate::lnurl_pay::{fail_with_reply, reply, LnurlPayTitles};
use crate::{Job, JobContext, JobId, JobOutcome, JobState};

pub struct LnurlPayInfoJob {
    outcome: JobOutcome,
    titles: LnurlPayTitles,
    payload: String,
}

impl LnurlPayInfoJob {
    pub fn new(ctx: JobContext) -> Self {
        let outcome = JobOutcome::new(ctx.id, NotificationType::LnurlPayInfo, ctx.runtime);
        let titles = LnurlPayTitles::new(
            &outcome,
            LNURL_PAY_INFO_NOTIFICATION_TITLE,
            DEFAULT_LNURL_PAY_INFO_NOTIFICATION_TITLE,
        );
        Self {
            outcome,
            titles,
            payload: ctx.message.payload,
        }
    }

    async fn pay_info(
        &self,
        node: &NodeConnection,
        request: &LnurlPayInfoRequest,
    ) -> anyhow::Result<LnurlPayInfoResponse> {
        let node_state = node.node_info().await?;
        if self.outcome.is_terminal() {
            return Err(anyhow!(ErrorCode::ForcedShutdown));
        }
        let quote = node
            .open_channel_fee(OpenChannelFeeRequest {
                amount_msat: None,
                expiry: None,
            })
            .await?;
        let (min_sendable, max_sendable) = sendable_range(&node_state, quote.fee_params.min_msat)?;
        debug!(job_id = %self.outcome.id(), min_sendable, max_sendable, "lnurl pay range");

        let metadata = self.outcome.runtime().resource(
            LNURL_PAY_METADATA_PLAIN_TEXT,
            DEFAULT_LNURL_PAY_METADATA_PLAIN_TEXT,
        );
        Ok(LnurlPayInfoResponse {
            callback: request.callback_url.clone(),
            max_sendable,
            min_sendable,
            metadata: plain_text_metadata(&metadata),
            tag: LNURL_PAY_REQUEST_TAG.to_owned(),
        })
    }
}

/// `(min, max)` the payer may send. Without enough inbound liquidity the
/// payment opens a channel, so the LSP's minimum applies.
pub fn sendable_range(node_state: &NodeState, lsp_min_msat: u64) -> Result<(u64, u64), ErrorCode> {
    let max = node_state.max_receivable_msat;
    let min = if node_state.inbound_liquidity_msat >= MIN_RECEIVABLE_MSAT {
        MIN_RECEIVABLE_MSAT
    } else {
        lsp_min_msat
    };
    if min > max {
        return Err(ErrorCode::InvalidSendableRange { min, max });
    }
    Ok((min, max))
}

#[async_trait]
impl Job for LnurlPayInfoJob {
    fn id(&self) -> JobId {
        self.outcome.id()
    }

    fn kind(&self) -> NotificationType {
        NotificationType::LnurlPayInfo
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
        let request: LnurlPayInfoRequest = match serde_json::from_str(&self.payload) {
            Ok(request) => request,
            Err(err) => {
                warn!(job_id = %self.outcome.id(), %err, "failed to decode lnurl info payload");
                self.outcome.fail(self.titles.failure.clone());
                return Err(anyhow!(ErrorCode::InvalidPayload(err.to_string())));
            }
        };

        match self.pay_info(&node, &request).await {
            Ok(response) => reply(&self.outcome, &self.titles, &request.reply_url, &response).await,
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
