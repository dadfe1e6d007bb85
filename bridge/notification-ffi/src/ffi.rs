use std::panic::PanicInfo;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{bail, Context};
use bridge::{ConnectionGuard, ServiceController, ServiceDeps};
use jobs::DefaultJobFactory;
use lazy_static::lazy_static;
use rpc_types::error::{get_error_code, ErrorCode};
use rpc_types::event::{Event, TypedEventExt as _};
use rpc_types::RpcInitOpts;
use runtime::api::LiveLnurlApi;
use runtime::bridge_runtime::Runtime;
pub use runtime::event::IEventSink as EventSink;
use runtime::node::INodeConnector;
use runtime::resources::StaticResources;
use runtime::utils::PoisonedLockExt;
use serde_json::json;
use tracing::{error, info, warn};

use crate::logging;

lazy_static! {
    // Global Tokio runtime
    pub static ref RUNTIME: tokio::runtime::Runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("failed to build runtime");
    // The node connection outlives service restarts within the process
    static ref CONNECTION: Arc<ConnectionGuard> = Arc::new(ConnectionGuard::new());
    static ref SERVICE: Mutex<Option<Arc<ServiceController>>> = Mutex::new(None);
}

pub fn rpc_error_json(error: &anyhow::Error) -> String {
    let code = get_error_code(error);

    json!({ "error": error.to_string(), "code": code, "detail": format!("{error:?}") }).to_string()
}

pub fn panic_hook(info: &PanicInfo, event_sink: &dyn EventSink) {
    event_sink.typed_event(&Event::panic(info.to_string()))
}

fn join_result(task_result: Result<String, tokio::task::JoinError>) -> String {
    match task_result {
        Ok(value) => value,
        Err(join_error) => {
            if join_error.is_panic() {
                rpc_error_json(&anyhow::format_err!(ErrorCode::Panic))
            } else {
                // we never cancel these tasks
                rpc_error_json(&anyhow::format_err!("unknown join error"))
            }
        }
    }
}

/// Creates the process-wide notification service. The host calls this once
/// its background execution starts, before forwarding any push message.
pub async fn notification_service_initialize(
    event_sink: Box<dyn EventSink>,
    connector: Arc<dyn INodeConnector>,
    init_opts_json: String,
) -> String {
    let task_result = RUNTIME
        .spawn(async move {
            match notification_service_initialize_inner(event_sink, connector, init_opts_json) {
                Ok(_) => String::from("{}"),
                Err(e) => {
                    error!(?e);
                    rpc_error_json(&e)
                }
            }
        })
        .await;
    join_result(task_result)
}

pub fn notification_service_initialize_inner(
    event_sink: Box<dyn EventSink>,
    connector: Arc<dyn INodeConnector>,
    init_opts_json: String,
) -> anyhow::Result<Arc<ServiceController>> {
    let init_opts: RpcInitOpts = match serde_json::from_str(&init_opts_json) {
        Ok(init_opts) => init_opts,
        Err(e) => {
            error!(?e, "Error parsing init_opts_json");
            bail!("Service init failed, cannot parse init_opts_json {:?}", e);
        }
    };
    let config = init_opts.service_config.unwrap_or_default();

    let mut service = SERVICE.ensure_lock();
    if let Some(service) = service.as_ref() {
        info!("service already initialized, updating config");
        service.set_config(config);
        return Ok(service.clone());
    }

    let Some(data_dir) = init_opts.data_dir else {
        error!("data_dir missing in init_opts_json");
        return Err(anyhow::format_err!(ErrorCode::InitializationFailed))
            .context("data_dir missing in init_opts_json");
    };
    let log_level = init_opts
        .log_level
        .unwrap_or_else(logging::default_log_filter);

    let event_sink: Arc<dyn EventSink> = event_sink.into();
    std::panic::set_hook(Box::new({
        let event_sink = event_sink.clone();
        move |info| {
            tracing::info!(%info, "panic");
            // write separately in case backtrace capturing bugs out.
            let backtrace = std::backtrace::Backtrace::force_capture();
            tracing::info!(%backtrace, "panic");

            panic_hook(info, &*event_sink);
        }
    }));
    let data_dir: PathBuf = data_dir.into();
    logging::init_logging(&data_dir, event_sink.clone(), &log_level)
        .context("Failed to initialize logging")?;
    info!("initialized logging");

    if init_opts.connect_request.is_none() {
        warn!("no connect request, push messages will be dropped");
    }
    let runtime = Arc::new(Runtime::new(
        event_sink,
        Arc::new(LiveLnurlApi::new()),
        Arc::new(StaticResources(init_opts.resources)),
    ));
    let controller = ServiceController::new(ServiceDeps {
        runtime,
        connector,
        connection: CONNECTION.clone(),
        connect_request: init_opts.connect_request,
        factory: Arc::new(DefaultJobFactory),
        config,
    });
    *service = Some(controller.clone());
    info!("notification service initialized");
    Ok(controller)
}

/// Hands a push message to the service. Resolves once the service tore down,
/// i.e. when the host may end its background execution.
pub async fn notification_service_on_message(message_json: String) -> String {
    let task_result = RUNTIME
        .spawn(async move {
            let Some(service) = SERVICE.ensure_lock().clone() else {
                return rpc_error_json(&anyhow::format_err!(ErrorCode::NotInitialized));
            };
            service.on_message(&message_json).wait().await;
            String::from("{}")
        })
        .await;
    join_result(task_result)
}

/// The OS is about to stop the background execution.
pub fn notification_service_shutdown() {
    let Some(service) = SERVICE.ensure_lock().clone() else {
        return;
    };
    let _guard = RUNTIME.enter();
    service.shutdown();
}

/// Returns the names of events we send from Rust to the host
pub fn notification_service_get_supported_events() -> Vec<String> {
    vec![
        String::from("notification"),
        String::from("serviceStopped"),
        String::from("log"),
        String::from("panic"),
    ]
}

#[cfg(test)]
mod tests {
    use runtime::test_device::{MockNodeConnector, MockNodeService, TestEventSink};

    use super::*;

    #[test]
    fn test_rpc_error_json_carries_code() {
        let err = anyhow::format_err!(ErrorCode::NotInitialized);
        let json: serde_json::Value = serde_json::from_str(&rpc_error_json(&err)).unwrap();
        assert_eq!(json["error"], "Not initialized");
        assert_eq!(json["code"], "notInitialized");
    }

    #[test]
    fn test_supported_events_match_typed_events() {
        let sink = TestEventSink::default();
        sink.typed_event(&Event::service_stopped());
        sink.typed_event(&Event::log("x".into()));
        sink.typed_event(&Event::panic("x".into()));
        let supported = notification_service_get_supported_events();
        for (event_type, _) in sink.events() {
            assert!(supported.contains(&event_type), "{event_type}");
        }
    }

    #[test]
    fn test_initialize_requires_valid_opts() {
        let connector: Arc<dyn INodeConnector> =
            Arc::new(MockNodeConnector::new(Arc::new(MockNodeService::default())));
        let result = RUNTIME.block_on(notification_service_initialize(
            Box::new(TestEventSink::default()),
            connector,
            "not json".into(),
        ));
        let json: serde_json::Value = serde_json::from_str(&result).unwrap();
        assert!(json["error"]
            .as_str()
            .unwrap()
            .contains("cannot parse init_opts_json"));
    }
}
