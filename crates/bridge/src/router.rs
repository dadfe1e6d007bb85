use std::panic::AssertUnwindSafe;
use std::sync::Weak;

use runtime::node::{INodeEventListener, NodeEvent};
use tracing::{debug, error};

use crate::controller::ServiceController;

/// Fans node events out to every registered job.
///
/// Registered with the node connection once per process. Delivery happens on
/// the caller's thread, in job id order, outside the controller lock.
pub struct EventRouter {
    controller: Weak<ServiceController>,
}

impl EventRouter {
    pub(crate) fn new(controller: Weak<ServiceController>) -> Self {
        Self { controller }
    }
}

impl INodeEventListener for EventRouter {
    fn on_event(&self, event: NodeEvent) {
        let Some(controller) = self.controller.upgrade() else {
            debug!(?event, "dropping node event, service is gone");
            return;
        };
        let jobs = controller.jobs_snapshot();
        debug!(?event, jobs = jobs.len(), "routing node event");
        for job in jobs {
            let delivered = std::panic::catch_unwind(AssertUnwindSafe(|| job.on_event(&event)));
            if delivered.is_err() {
                error!(job_id = %job.id(), "job panicked handling node event");
            }
        }
    }
}
