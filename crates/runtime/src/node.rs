//! Capabilities of the Lightning node service that the notification jobs rely
//! on. The node itself runs elsewhere; the host hands us a connector that
//! knows how to reach it.
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Everything needed to reach the node. Opaque to us, the host fills it in
/// (API key, network, working dir, ...) and the connector interprets it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectRequest {
    pub config: serde_json::Value,
    pub seed: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeState {
    pub id: String,
    pub block_height: u32,
    pub channels_balance_msat: u64,
    /// Largest amount the node can receive right now, including what a new
    /// channel could bring in.
    pub max_receivable_msat: u64,
    /// Receivable over existing channels, without opening a new one.
    pub inbound_liquidity_msat: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpeningFeeParams {
    pub min_msat: u64,
    /// Parts per million of the received amount
    pub proportional: u32,
    pub valid_until: String,
    pub max_idle_time: u32,
    pub max_client_to_self_delay: u32,
    pub promise: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenChannelFeeRequest {
    /// `None` asks for the fee parameters only, without a concrete fee.
    pub amount_msat: Option<u64>,
    pub expiry: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenChannelFeeResponse {
    /// Zero when the amount fits into existing inbound liquidity.
    pub fee_msat: u64,
    pub fee_params: OpeningFeeParams,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceivePaymentRequest {
    pub amount_msat: u64,
    pub description: String,
    pub use_description_hash: bool,
    pub opening_fee_params: Option<OpeningFeeParams>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LnInvoice {
    pub bolt11: String,
    pub payment_hash: String,
    pub amount_msat: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceivePaymentResponse {
    pub ln_invoice: LnInvoice,
    pub opening_fee_msat: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PaymentStatus {
    Pending,
    Complete,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub payment_hash: String,
    pub amount_msat: u64,
    pub fee_msat: u64,
    pub status: PaymentStatus,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoicePaidDetails {
    pub payment_hash: String,
    pub bolt11: String,
    pub payment: Option<Payment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentFailedData {
    pub error: String,
    pub node_id: String,
    pub invoice: Option<LnInvoice>,
}

/// Events pushed by the node service while we are connected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum NodeEvent {
    NewBlock { block: u32 },
    Synced,
    InvoicePaid { details: InvoicePaidDetails },
    PaymentSucceed { details: Payment },
    PaymentFailed { details: PaymentFailedData },
    /// Transactions paying to a watched on-chain address confirmed.
    AddressTxsConfirmed { address: String },
}

/// Connected node service. Shared by every job of the process.
#[async_trait]
pub trait INodeService: Send + Sync + 'static {
    async fn node_info(&self) -> anyhow::Result<NodeState>;

    /// Quotes the fee for opening a channel able to receive the amount.
    async fn open_channel_fee(
        &self,
        req: OpenChannelFeeRequest,
    ) -> anyhow::Result<OpenChannelFeeResponse>;

    /// Creates an invoice for the requested amount.
    async fn receive_payment(
        &self,
        req: ReceivePaymentRequest,
    ) -> anyhow::Result<ReceivePaymentResponse>;

    async fn payment_by_hash(&self, payment_hash: String) -> anyhow::Result<Option<Payment>>;
}

pub type NodeConnection = Arc<dyn INodeService>;

/// Receives node events, registered once when connecting.
pub trait INodeEventListener: Send + Sync + 'static {
    fn on_event(&self, event: NodeEvent);
}

#[async_trait]
pub trait INodeConnector: Send + Sync + 'static {
    /// Establishes the connection. Expensive: callers are expected to do this
    /// once per process.
    async fn connect(
        &self,
        req: ConnectRequest,
        listener: Arc<dyn INodeEventListener>,
    ) -> anyhow::Result<NodeConnection>;
}
