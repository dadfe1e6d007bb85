use std::any::Any;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::FutureExt as _;
use jobs::{Job, JobContext, JobFactory, JobId};
use rpc_types::error::{get_error_code, ErrorCode};
use rpc_types::event::{Event, TypedEventExt as _};
use rpc_types::{NotificationMessage, RpcJobId};
use runtime::bridge_runtime::Runtime;
use runtime::config::ServiceConfig;
use runtime::node::{ConnectRequest, INodeConnector, INodeEventListener};
use runtime::utils::PoisonedLockExt;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::connection::ConnectionGuard;
use crate::exit::ExitSignal;
use crate::router::EventRouter;
use crate::timer::{Timer, TimerId};

/// Collaborators of the [`ServiceController`].
pub struct ServiceDeps {
    pub runtime: Arc<Runtime>,
    pub connector: Arc<dyn INodeConnector>,
    pub connection: Arc<ConnectionGuard>,
    /// `None` when the host has no credentials yet. Messages are then
    /// dropped.
    pub connect_request: Option<ConnectRequest>,
    pub factory: Arc<dyn JobFactory>,
    pub config: ServiceConfig,
}

/// Receives push messages, runs one job per message and decides when the
/// background service may exit.
///
/// Lives for the whole process. Every message opens a new execution window
/// bounded by the service timeout. Once no job is left, the service lingers
/// for the shutdown delay and then tears down.
pub struct ServiceController {
    runtime: Arc<Runtime>,
    connector: Arc<dyn INodeConnector>,
    connection: Arc<ConnectionGuard>,
    connect_request: Option<ConnectRequest>,
    factory: Arc<dyn JobFactory>,
    router: Arc<EventRouter>,
    next_job_id: AtomicU64,
    // never held across an await point
    state: Mutex<ControllerState>,
    teardowns: watch::Sender<u64>,
}

struct ControllerState {
    config: Arc<ServiceConfig>,
    /// Started jobs that have not finished yet
    jobs: BTreeMap<JobId, Arc<dyn Job>>,
    /// Jobs waiting for the node connection
    connecting: BTreeMap<JobId, Arc<dyn Job>>,
    service_timeout: Option<Timer>,
    shutdown_delay: Option<Timer>,
    shutdown_delay_arms: u64,
    torn_down: bool,
}

impl ControllerState {
    fn is_idle(&self) -> bool {
        self.jobs.is_empty() && self.connecting.is_empty()
    }

    /// Every job, started or connecting, in id order.
    fn drain_jobs(&mut self) -> Vec<Arc<dyn Job>> {
        let mut jobs = std::mem::take(&mut self.jobs);
        jobs.append(&mut self.connecting);
        jobs.into_values().collect()
    }
}

impl ServiceController {
    pub fn new(deps: ServiceDeps) -> Arc<Self> {
        Arc::new_cyclic(|controller| Self {
            runtime: deps.runtime,
            connector: deps.connector,
            connection: deps.connection,
            connect_request: deps.connect_request,
            factory: deps.factory,
            router: Arc::new(EventRouter::new(controller.clone())),
            next_job_id: AtomicU64::new(0),
            state: Mutex::new(ControllerState {
                config: Arc::new(deps.config),
                jobs: BTreeMap::new(),
                connecting: BTreeMap::new(),
                service_timeout: None,
                shutdown_delay: None,
                shutdown_delay_arms: 0,
                torn_down: false,
            }),
            teardowns: watch::Sender::new(0),
        })
    }

    /// Handles one raw push message. Must be called from within a tokio
    /// runtime.
    pub fn on_message(self: &Arc<Self>, raw: &str) -> ExitSignal {
        let exit = ExitSignal::new(self.teardowns.subscribe());
        let config = {
            let mut state = self.state.ensure_lock();
            state.torn_down = false;
            state.shutdown_delay = None;
            let timeout = state.config.service_timeout();
            state.service_timeout = Some(self.schedule_service_timeout(timeout));
            state.config.clone()
        };

        let Some(message) = NotificationMessage::decode(raw) else {
            warn!(error = %ErrorCode::InvalidMessage, "ignoring push message");
            self.arm_shutdown_delay_if_idle(&mut self.state.ensure_lock());
            return exit;
        };
        let id = RpcJobId(self.next_job_id.fetch_add(1, Ordering::SeqCst));
        let kind = message.notification_type;
        let Some(job) = self.factory.create_job(JobContext {
            id,
            message,
            runtime: self.runtime.clone(),
            config,
        }) else {
            warn!(job_id = %id, %kind, "no job handles push message");
            self.arm_shutdown_delay_if_idle(&mut self.state.ensure_lock());
            return exit;
        };
        info!(job_id = %id, %kind, "received push message");

        let Some(connect_request) = self.connect_request.clone() else {
            warn!(job_id = %id, error = %ErrorCode::MissingConnectRequest, "can't run job");
            job.on_start_failed();
            self.arm_shutdown_delay_if_idle(&mut self.state.ensure_lock());
            return exit;
        };

        self.state.ensure_lock().connecting.insert(id, job.clone());
        tokio::spawn({
            let controller = self.clone();
            async move { controller.run_job(job, connect_request).await }
        });
        exit
    }

    async fn run_job(self: Arc<Self>, job: Arc<dyn Job>, connect_request: ConnectRequest) {
        let id = job.id();
        let listener: Arc<dyn INodeEventListener> = self.router.clone();
        if !self.connection.is_connected() {
            debug!(job_id = %id, "waiting for node connection");
        }
        let connected = self
            .connection
            .get_or_connect(self.connector.as_ref(), &connect_request, listener)
            .await;
        let node = match connected {
            Ok(node) => node,
            Err(err) => {
                error!(job_id = %id, error_code = ?get_error_code(&err), "job can't connect: {err:#}");
                job.on_start_failed();
                let mut state = self.state.ensure_lock();
                state.connecting.remove(&id);
                self.arm_shutdown_delay_if_idle(&mut state);
                return;
            }
        };

        {
            let mut state = self.state.ensure_lock();
            state.connecting.remove(&id);
            // registered jobs are always running
            if state.torn_down || !job.mark_running() {
                drop(state);
                info!(job_id = %id, "service stopped while connecting, not starting job");
                job.on_shutdown();
                return;
            }
            state.jobs.insert(id, job.clone());
            state.shutdown_delay = None;
        }

        debug!(job_id = %id, kind = %job.kind(), "starting job");
        match AssertUnwindSafe(job.start(node)).catch_unwind().await {
            Ok(Ok(())) => debug!(job_id = %id, state = ?job.state(), "job finished"),
            Ok(Err(err)) => {
                warn!(job_id = %id, error_code = ?get_error_code(&err), "job failed: {err:#}");
            }
            Err(panic) => {
                error!(job_id = %id, error = %ErrorCode::Panic, "job panicked: {}", panic_message(&*panic));
            }
        }
        // no-op unless the job returned without reporting an outcome
        job.on_shutdown();
        self.on_finished(id);
    }

    /// Removes a finished job. The service starts lingering once the last one
    /// is gone.
    pub fn on_finished(self: &Arc<Self>, job_id: JobId) {
        let mut state = self.state.ensure_lock();
        if state.jobs.remove(&job_id).is_none() {
            // drained by a shutdown
            return;
        }
        debug!(%job_id, remaining = state.jobs.len(), "job removed");
        self.arm_shutdown_delay_if_idle(&mut state);
    }

    /// Host-initiated stop, e.g. the OS is about to kill the background
    /// execution. Running jobs report failure like on a service timeout.
    pub fn shutdown(&self) {
        let jobs = self.state.ensure_lock().drain_jobs();
        info!(jobs = jobs.len(), "shutdown requested");
        self.force_shutdown(jobs);
    }

    /// Applies to jobs created after this call.
    pub fn set_config(&self, config: ServiceConfig) {
        info!(?config, "updated service config");
        self.state.ensure_lock().config = Arc::new(config);
    }

    pub fn config(&self) -> Arc<ServiceConfig> {
        self.state.ensure_lock().config.clone()
    }

    pub fn active_jobs(&self) -> Vec<JobId> {
        self.state.ensure_lock().jobs.keys().copied().collect()
    }

    pub fn is_torn_down(&self) -> bool {
        self.state.ensure_lock().torn_down
    }

    pub fn is_shutdown_delay_armed(&self) -> bool {
        self.state.ensure_lock().shutdown_delay.is_some()
    }

    /// How often the service started lingering since it was created.
    pub fn shutdown_delay_arms(&self) -> u64 {
        self.state.ensure_lock().shutdown_delay_arms
    }

    pub(crate) fn jobs_snapshot(&self) -> Vec<Arc<dyn Job>> {
        self.state.ensure_lock().jobs.values().cloned().collect()
    }

    fn arm_shutdown_delay_if_idle(self: &Arc<Self>, state: &mut ControllerState) {
        if state.torn_down || !state.is_idle() || state.shutdown_delay.is_some() {
            return;
        }
        let delay = state.config.shutdown_delay();
        state.shutdown_delay_arms += 1;
        debug!(?delay, arms = state.shutdown_delay_arms, "no jobs left, arming shutdown delay");
        let controller = Arc::downgrade(self);
        state.shutdown_delay = Some(Timer::schedule(delay, move |timer_id| {
            if let Some(controller) = controller.upgrade() {
                controller.on_shutdown_delay(timer_id);
            }
        }));
    }

    fn schedule_service_timeout(self: &Arc<Self>, timeout: Duration) -> Timer {
        let controller = Arc::downgrade(self);
        Timer::schedule(timeout, move |timer_id| {
            if let Some(controller) = controller.upgrade() {
                controller.on_service_timeout(timer_id);
            }
        })
    }

    fn on_service_timeout(&self, timer_id: TimerId) {
        let jobs = {
            let mut state = self.state.ensure_lock();
            if state.service_timeout.as_ref().map(Timer::id) != Some(timer_id) {
                return;
            }
            state.service_timeout = None;
            state.drain_jobs()
        };
        warn!(jobs = jobs.len(), "service timeout reached");
        self.force_shutdown(jobs);
    }

    fn on_shutdown_delay(&self, timer_id: TimerId) {
        {
            let mut state = self.state.ensure_lock();
            if state.shutdown_delay.as_ref().map(Timer::id) != Some(timer_id) {
                return;
            }
            state.shutdown_delay = None;
            if !state.is_idle() {
                return;
            }
        }
        self.teardown();
    }

    fn force_shutdown(&self, jobs: Vec<Arc<dyn Job>>) {
        for job in jobs {
            debug!(job_id = %job.id(), state = ?job.state(), "shutting down job");
            job.on_shutdown();
        }
        self.teardown();
    }

    fn teardown(&self) {
        {
            let mut state = self.state.ensure_lock();
            state.service_timeout = None;
            state.shutdown_delay = None;
            if state.torn_down {
                return;
            }
            state.torn_down = true;
        }
        info!("notification service stopped");
        self.runtime.event_sink.typed_event(&Event::service_stopped());
        self.teardowns.send_modify(|teardowns| *teardowns += 1);
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}
