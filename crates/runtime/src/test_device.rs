//! In-memory stand-ins for the host and the node service, used by the tests
//! of every crate in the workspace.
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU16, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, bail};
use async_trait::async_trait;
use tokio::sync::Semaphore;

use crate::api::{ILnurlApi, LnurlReplyError};
use crate::bridge_runtime::Runtime;
use crate::event::{EventSink, IEventSink};
use crate::node::{
    ConnectRequest, INodeConnector, INodeEventListener, INodeService, LnInvoice, NodeConnection,
    NodeEvent, NodeState, OpenChannelFeeRequest, OpenChannelFeeResponse, OpeningFeeParams,
    Payment, ReceivePaymentRequest, ReceivePaymentResponse,
};
use crate::resources::StaticResources;
use crate::utils::PoisonedLockExt;

pub const TEST_BOLT11: &str = "lnbc50n1pjtestinvoice";
pub const TEST_PAYMENT_HASH: &str = "c0ffee";

/// Blocks callers until released. Open unless built with `closed()`.
pub struct Gate(Semaphore);

impl Gate {
    pub fn open() -> Self {
        Self(Semaphore::new(Semaphore::MAX_PERMITS))
    }

    pub fn closed() -> Self {
        Self(Semaphore::new(0))
    }

    pub fn release(&self) {
        self.0
            .add_permits(Semaphore::MAX_PERMITS - self.0.available_permits());
    }

    async fn pass(&self) {
        let _permit = self.0.acquire().await.expect("never closed");
    }
}

#[derive(Default)]
pub struct TestEventSink {
    events: Mutex<Vec<(String, String)>>,
}

impl TestEventSink {
    pub fn bodies_of_type(&self, event_type: &str) -> Vec<serde_json::Value> {
        self.events
            .ensure_lock()
            .iter()
            .filter(|(ty, _)| ty == event_type)
            .map(|(_, body)| serde_json::from_str(body).expect("events are json"))
            .collect()
    }
}

impl IEventSink for TestEventSink {
    fn event(&self, event_type: String, body: String) {
        self.events.ensure_lock().push((event_type, body));
    }

    fn events(&self) -> Vec<(String, String)> {
        self.events.ensure_lock().clone()
    }

    fn num_events_of_type(&self, event_type: String) -> usize {
        self.events
            .ensure_lock()
            .iter()
            .filter(|(ty, _)| *ty == event_type)
            .count()
    }
}

pub struct MockLnurlApi {
    status: AtomicU16,
    unreachable: Mutex<bool>,
    requests: Mutex<Vec<(String, serde_json::Value)>>,
    pub gate: Gate,
}

impl Default for MockLnurlApi {
    fn default() -> Self {
        Self {
            status: AtomicU16::new(200),
            unreachable: Mutex::new(false),
            requests: Mutex::default(),
            gate: Gate::open(),
        }
    }
}

impl MockLnurlApi {
    pub fn with_status(status: u16) -> Self {
        let api = Self::default();
        api.status.store(status, Ordering::SeqCst);
        api
    }

    pub fn blocked() -> Self {
        Self {
            gate: Gate::closed(),
            ..Self::default()
        }
    }

    pub fn set_unreachable(&self) {
        *self.unreachable.ensure_lock() = true;
    }

    pub fn requests(&self) -> Vec<(String, serde_json::Value)> {
        self.requests.ensure_lock().clone()
    }
}

#[async_trait]
impl ILnurlApi for MockLnurlApi {
    async fn post_json(
        &self,
        url: &str,
        body: serde_json::Value,
    ) -> Result<u16, LnurlReplyError> {
        self.requests.ensure_lock().push((url.to_owned(), body));
        self.gate.pass().await;
        if *self.unreachable.ensure_lock() {
            return Err(LnurlReplyError::ErrorSendingRequest(
                "connection refused".into(),
            ));
        }
        Ok(self.status.load(Ordering::SeqCst))
    }
}

pub struct MockNodeService {
    pub node_state: Mutex<NodeState>,
    pub fee_quote: Mutex<OpenChannelFeeResponse>,
    pub fee_error: Mutex<Option<String>>,
    pub payments: Mutex<BTreeMap<String, Payment>>,
    pub fee_requests: Mutex<Vec<OpenChannelFeeRequest>>,
    pub receive_requests: Mutex<Vec<ReceivePaymentRequest>>,
    pub gate: Gate,
}

impl Default for MockNodeService {
    fn default() -> Self {
        Self {
            node_state: Mutex::new(NodeState {
                id: "02mocknode".into(),
                block_height: 800_000,
                channels_balance_msat: 0,
                max_receivable_msat: 4_000_000_000,
                inbound_liquidity_msat: 0,
            }),
            fee_quote: Mutex::new(OpenChannelFeeResponse {
                fee_msat: 0,
                fee_params: OpeningFeeParams {
                    min_msat: 2_000_000,
                    proportional: 4_000,
                    ..Default::default()
                },
            }),
            fee_error: Mutex::new(None),
            payments: Mutex::default(),
            fee_requests: Mutex::default(),
            receive_requests: Mutex::default(),
            gate: Gate::open(),
        }
    }
}

impl MockNodeService {
    pub fn blocked() -> Self {
        Self {
            gate: Gate::closed(),
            ..Self::default()
        }
    }

    pub fn set_fee_quote(&self, fee_msat: u64, min_msat: u64) {
        let mut quote = self.fee_quote.ensure_lock();
        quote.fee_msat = fee_msat;
        quote.fee_params.min_msat = min_msat;
    }

    pub fn set_fee_error(&self, error: &str) {
        *self.fee_error.ensure_lock() = Some(error.to_owned());
    }

    pub fn receive_requests(&self) -> Vec<ReceivePaymentRequest> {
        self.receive_requests.ensure_lock().clone()
    }
}

#[async_trait]
impl INodeService for MockNodeService {
    async fn node_info(&self) -> anyhow::Result<NodeState> {
        self.gate.pass().await;
        Ok(self.node_state.ensure_lock().clone())
    }

    async fn open_channel_fee(
        &self,
        req: OpenChannelFeeRequest,
    ) -> anyhow::Result<OpenChannelFeeResponse> {
        self.fee_requests.ensure_lock().push(req);
        self.gate.pass().await;
        if let Some(error) = self.fee_error.ensure_lock().clone() {
            bail!(error);
        }
        Ok(self.fee_quote.ensure_lock().clone())
    }

    async fn receive_payment(
        &self,
        req: ReceivePaymentRequest,
    ) -> anyhow::Result<ReceivePaymentResponse> {
        let amount_msat = req.amount_msat;
        self.receive_requests.ensure_lock().push(req);
        self.gate.pass().await;
        Ok(ReceivePaymentResponse {
            ln_invoice: LnInvoice {
                bolt11: TEST_BOLT11.into(),
                payment_hash: TEST_PAYMENT_HASH.into(),
                amount_msat: Some(amount_msat),
            },
            opening_fee_msat: None,
        })
    }

    async fn payment_by_hash(&self, payment_hash: String) -> anyhow::Result<Option<Payment>> {
        self.gate.pass().await;
        Ok(self.payments.ensure_lock().get(&payment_hash).cloned())
    }
}

/// Counts connection attempts and keeps the registered listener so tests can
/// push node events.
pub struct MockNodeConnector {
    pub node: Arc<MockNodeService>,
    attempts: AtomicUsize,
    failures_left: AtomicUsize,
    connect_delay: Duration,
    listener: Mutex<Option<Arc<dyn INodeEventListener>>>,
}

impl MockNodeConnector {
    pub fn new(node: Arc<MockNodeService>) -> Self {
        Self {
            node,
            attempts: AtomicUsize::new(0),
            failures_left: AtomicUsize::new(0),
            connect_delay: Duration::ZERO,
            listener: Mutex::new(None),
        }
    }

    /// Each attempt sleeps for `delay` before resolving.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = delay;
        self
    }

    /// The next `n` attempts fail.
    pub fn failing(self, n: usize) -> Self {
        self.failures_left.store(n, Ordering::SeqCst);
        self
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn emit(&self, event: NodeEvent) {
        let listener = self
            .listener
            .ensure_lock()
            .clone()
            .expect("emit called before connect");
        listener.on_event(event);
    }
}

#[async_trait]
impl INodeConnector for MockNodeConnector {
    async fn connect(
        &self,
        _req: ConnectRequest,
        listener: Arc<dyn INodeEventListener>,
    ) -> anyhow::Result<NodeConnection> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if !self.connect_delay.is_zero() {
            tokio::time::sleep(self.connect_delay).await;
        }
        let failed = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(anyhow!("node unreachable"));
        }
        *self.listener.ensure_lock() = Some(listener);
        Ok(self.node.clone())
    }
}

pub fn test_connect_request() -> ConnectRequest {
    ConnectRequest {
        config: serde_json::json!({ "network": "regtest" }),
        seed: vec![7; 32],
    }
}

/// Runtime wired to the given fakes, with default resources.
pub fn test_runtime(event_sink: Arc<TestEventSink>, lnurl_api: Arc<MockLnurlApi>) -> Arc<Runtime> {
    let event_sink: EventSink = event_sink;
    Arc::new(Runtime::new(
        event_sink,
        lnurl_api,
        Arc::new(StaticResources::default()),
    ))
}
