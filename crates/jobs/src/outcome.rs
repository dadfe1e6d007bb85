use std::sync::Arc;

use rpc_types::event::{Event, TypedEventExt as _};
use rpc_types::NotificationType;
use runtime::bridge_runtime::Runtime;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::{JobId, JobState};

/// Single-fire state machine behind every job.
///
/// Only the first transition into a terminal state is accepted and it is the
/// only one that notifies the host. Later attempts (a late HTTP response
/// after a forced shutdown, a duplicate node event) are ignored.
pub struct JobOutcome {
    id: JobId,
    kind: NotificationType,
    runtime: Arc<Runtime>,
    state: watch::Sender<JobState>,
}

impl JobOutcome {
    pub fn new(id: JobId, kind: NotificationType, runtime: Arc<Runtime>) -> Self {
        Self {
            id,
            kind,
            runtime,
            state: watch::Sender::new(JobState::Created),
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn kind(&self) -> NotificationType {
        self.kind
    }

    pub fn runtime(&self) -> &Arc<Runtime> {
        &self.runtime
    }

    pub fn state(&self) -> JobState {
        *self.state.borrow()
    }

    pub fn is_terminal(&self) -> bool {
        self.state().is_terminal()
    }

    /// `Created -> Running`, a no-op when already running. Returns false when
    /// the job already resolved, in which case it must not do any work.
    pub fn mark_running(&self) -> bool {
        let mut running = false;
        self.state.send_if_modified(|state| match state {
            JobState::Created => {
                *state = JobState::Running;
                running = true;
                true
            }
            JobState::Running => {
                running = true;
                false
            }
            _ => false,
        });
        running
    }

    pub fn complete(&self, title: String) -> bool {
        self.resolve(JobState::Completed, title)
    }

    pub fn fail(&self, title: String) -> bool {
        self.resolve(JobState::Failed, title)
    }

    pub fn force_shutdown(&self, title: String) -> bool {
        self.resolve(JobState::ShutdownForced, title)
    }

    /// Resolves once the job reached a terminal state.
    pub async fn wait_terminal(&self) -> JobState {
        let mut rx = self.state.subscribe();
        // the sender lives in self, so the channel can't close while we wait
        let res = match rx.wait_for(|state| state.is_terminal()).await {
            Ok(state) => *state,
            Err(_) => self.state(),
        };
        res
    }

    fn resolve(&self, to: JobState, title: String) -> bool {
        debug_assert!(to.is_terminal());
        let mut from = JobState::Created;
        let resolved = self.state.send_if_modified(|state| {
            if state.is_terminal() {
                return false;
            }
            from = *state;
            *state = to;
            true
        });
        if !resolved {
            debug!(job_id = %self.id, kind = %self.kind, attempted = ?to, "job already resolved");
            return false;
        }
        info!(job_id = %self.id, kind = %self.kind, ?from, ?to, %title, "job resolved");
        self.runtime.event_sink.typed_event(&Event::notification(
            self.id,
            self.kind,
            title,
            to == JobState::Completed,
        ));
        true
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rpc_types::RpcJobId;

    use super::*;
    use crate::test_utils::TestEnv;

    fn outcome(env: &TestEnv) -> Arc<JobOutcome> {
        Arc::new(JobOutcome::new(
            RpcJobId(7),
            NotificationType::PaymentReceived,
            env.runtime.clone(),
        ))
    }

    #[test]
    fn test_first_terminal_transition_wins() {
        let env = TestEnv::new();
        let outcome = outcome(&env);
        assert!(outcome.mark_running());
        assert!(outcome.mark_running());
        assert_eq!(outcome.state(), JobState::Running);

        assert!(outcome.force_shutdown("failed".into()));
        assert!(!outcome.complete("done".into()));
        assert!(!outcome.fail("failed again".into()));

        assert_eq!(outcome.state(), JobState::ShutdownForced);
        assert_eq!(env.notifications(), vec![("failed".to_owned(), false)]);
        let body = &env.sink.bodies_of_type("notification")[0];
        assert_eq!(body["jobId"], 7);
        assert_eq!(body["kind"], "payment_received");
    }

    #[test]
    fn test_resolved_before_running() {
        let env = TestEnv::new();
        let outcome = outcome(&env);
        assert!(outcome.complete("done".into()));
        assert!(!outcome.mark_running());
        assert_eq!(outcome.state(), JobState::Completed);
        assert_eq!(env.notifications(), vec![("done".to_owned(), true)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_terminal() {
        let env = TestEnv::new();
        let outcome = outcome(&env);
        outcome.mark_running();

        let waiter = tokio::spawn({
            let outcome = outcome.clone();
            async move { outcome.wait_terminal().await }
        });
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(!waiter.is_finished());

        outcome.fail("failed".into());
        assert_eq!(waiter.await.unwrap(), JobState::Failed);
        // already terminal resolves immediately
        assert_eq!(outcome.wait_terminal().await, JobState::Failed);
    }

    #[tokio::test]
    async fn test_concurrent_resolution_emits_once() {
        let env = TestEnv::new();
        let outcome = outcome(&env);
        outcome.mark_running();

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let outcome = outcome.clone();
                tokio::spawn(async move {
                    if i % 2 == 0 {
                        outcome.complete("done".into())
                    } else {
                        outcome.force_shutdown("failed".into())
                    }
                })
            })
            .collect();
        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
        assert_eq!(env.notifications().len(), 1);
    }
}
