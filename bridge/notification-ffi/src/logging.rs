use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;

use anyhow::Context;
use rolling_file::{BasicRollingFileAppender, RollingConditionBasic};
use rpc_types::event::{Event, EventSink, TypedEventExt};
use tracing_serde::AsSerde;
// nosemgrep: ban-wildcard-imports
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Layer};

pub const LOG_FILE_NAME: &str = "notification.log";

pub fn default_log_filter() -> String {
    "info,notificationffi=trace,bridge=debug,jobs=debug,runtime=debug".to_owned()
}

/// Forwards every tracing event to the host as a `log` event.
pub struct ReactNativeLayer(pub EventSink);

impl<S> Layer<S> for ReactNativeLayer
where
    S: tracing::Subscriber,
{
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        if let Ok(event) = serde_json::to_string(&event.as_serde()) {
            self.0.typed_event(&Event::log(event));
        }
    }
}

pub fn init_logging(
    data_dir: &Path,
    event_sink: EventSink,
    log_filter: &str,
) -> anyhow::Result<()> {
    const MB: u64 = 1024 * 1024;
    const MAX_FILE_COUNT: usize = 2;
    let log_file_writer = BasicRollingFileAppender::new(
        data_dir.join(LOG_FILE_NAME),
        RollingConditionBasic::new().max_size(5 * MB),
        MAX_FILE_COUNT,
    )
    .context("failed to open log file")?;

    let log_file_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(Mutex::new(log_file_writer));

    let reg = tracing_subscriber::registry();

    #[cfg(debug_assertions)]
    let reg = reg.with(
        ReactNativeLayer(event_sink)
            .with_filter(EnvFilter::from_str(log_filter).unwrap_or_default()),
    );
    #[cfg(not(debug_assertions))]
    let _ = (event_sink, log_filter);

    reg.with(log_file_layer.with_filter(EnvFilter::new(default_log_filter())))
        .try_init()
        .unwrap_or_else(|error| tracing::info!("Error installing logger: {}", error));

    Ok(())
}

pub fn init_logging_test() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init()
        .unwrap_or_else(|error| tracing::info!("Error installing logger: {}", error));

    Ok(())
}
