use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use anyhow::anyhow;
use rpc_types::error::ErrorCode;
use runtime::constants::SLOW_CONNECT_WARN;
use runtime::node::{ConnectRequest, INodeConnector, INodeEventListener, NodeConnection};
use runtime::utils::timeout_log_only;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

/// Connects to the node service at most once per process.
///
/// Reads after the first successful connect are lock free. Attempts are
/// serialized: callers that waited on an attempt that failed get that same
/// failure, callers arriving afterwards try again.
#[derive(Default)]
pub struct ConnectionGuard {
    connection: OnceLock<NodeConnection>,
    attempt: Mutex<Option<String>>,
    // bumped after every failed attempt
    failures: AtomicU64,
}

impl ConnectionGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_connected(&self) -> bool {
        self.connection.get().is_some()
    }

    pub async fn get_or_connect(
        &self,
        connector: &dyn INodeConnector,
        request: &ConnectRequest,
        listener: Arc<dyn INodeEventListener>,
    ) -> anyhow::Result<NodeConnection> {
        if let Some(connection) = self.connection.get() {
            return Ok(connection.clone());
        }
        let failures_seen = self.failures.load(Ordering::SeqCst);
        let mut last_failure = self.attempt.lock().await;
        if let Some(connection) = self.connection.get() {
            return Ok(connection.clone());
        }
        if self.failures.load(Ordering::SeqCst) != failures_seen {
            if let Some(failure) = last_failure.as_ref() {
                warn!(%failure, "connection attempt we waited on failed");
                return Err(anyhow!(ErrorCode::ConnectionFailed(failure.clone())));
            }
        }

        info!("connecting to node service");
        let res = timeout_log_only(
            connector.connect(request.clone(), listener),
            SLOW_CONNECT_WARN,
            || warn!(timeout = ?SLOW_CONNECT_WARN, "connecting to node service is slow"),
        )
        .await;
        match res {
            Ok(connection) => {
                *last_failure = None;
                info!("connected to node service");
                Ok(self.connection.get_or_init(|| connection).clone())
            }
            Err(err) => {
                let failure = format!("{err:#}");
                error!(%failure, "failed to connect to node service");
                *last_failure = Some(failure.clone());
                self.failures.fetch_add(1, Ordering::SeqCst);
                Err(err.context(ErrorCode::ConnectionFailed(failure)))
            }
        }
    }
}
