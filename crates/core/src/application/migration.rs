// Background Migration Runner
//
// Launches the migration task at boot, detached from queue registration:
// consumers come up whether or not migrations run, and a migration failure
// is an observability event, never a process failure.

use crate::port::BackgroundMigration;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Terminal result of the migration task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationOutcome {
    Succeeded,
    Failed(String),
}

/// Lifecycle: NotStarted -> Running -> Completed, each transition once
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationState {
    NotStarted,
    Running,
    Completed(MigrationOutcome),
}

pub struct MigrationRunner {
    task: Arc<dyn BackgroundMigration>,
    state: Mutex<MigrationState>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl MigrationRunner {
    pub fn new(task: Arc<dyn BackgroundMigration>) -> Self {
        Self {
            task,
            state: Mutex::new(MigrationState::NotStarted),
            handle: Mutex::new(None),
        }
    }

    pub fn state(&self) -> MigrationState {
        self.state.lock().unwrap().clone()
    }

    /// Spawn the migration task if the deployment enables it.
    ///
    /// Returns immediately; the outcome is observed asynchronously.
    /// Exactly-once: a second call while started is a warn no-op.
    pub fn start_if_enabled(self: &Arc<Self>, enabled: bool) {
        if !enabled {
            info!("background migrations disabled");
            return;
        }

        {
            let mut state = self.state.lock().unwrap();
            if !matches!(*state, MigrationState::NotStarted) {
                warn!("background migrations already started, ignoring");
                return;
            }
            *state = MigrationState::Running;
        }

        let runner = Arc::clone(self);
        let handle = tokio::spawn(async move {
            info!(task = runner.task.name(), "background migrations started");

            let outcome = match runner.task.run().await {
                Ok(()) => {
                    info!(task = runner.task.name(), "background migrations completed");
                    MigrationOutcome::Succeeded
                }
                Err(e) => {
                    error!(
                        task = runner.task.name(),
                        error = %e,
                        "background migrations failed, queues keep serving"
                    );
                    MigrationOutcome::Failed(e.to_string())
                }
            };

            runner.complete(outcome);
        });

        *self.handle.lock().unwrap() = Some(handle);
    }

    /// Shutdown hook: abort the task if it is still running
    pub async fn interrupt(&self) {
        let handle = self.handle.lock().unwrap().take();
        let Some(handle) = handle else { return };

        if matches!(self.state(), MigrationState::Running) {
            warn!("interrupting background migrations for shutdown");
            handle.abort();
            let _ = handle.await;
            self.complete(MigrationOutcome::Failed(
                "interrupted by shutdown".to_string(),
            ));
        } else {
            let _ = handle.await;
        }
    }

    /// Record the terminal state; first writer wins
    fn complete(&self, outcome: MigrationOutcome) {
        let mut state = self.state.lock().unwrap();
        if matches!(*state, MigrationState::Running) {
            *state = MigrationState::Completed(outcome);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::migration::mocks::{MockBehavior, MockMigration};
    use std::time::Duration;

    async fn wait_for_completion(runner: &MigrationRunner) -> MigrationState {
        for _ in 0..100 {
            let state = runner.state();
            if matches!(state, MigrationState::Completed(_)) {
                return state;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        runner.state()
    }

    #[tokio::test]
    async fn disabled_never_starts() {
        let task = Arc::new(MockMigration::new(MockBehavior::Success));
        let runner = Arc::new(MigrationRunner::new(task.clone()));

        runner.start_if_enabled(false);
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(runner.state(), MigrationState::NotStarted);
        assert_eq!(task.runs(), 0);
    }

    #[tokio::test]
    async fn success_is_recorded() {
        let task = Arc::new(MockMigration::new(MockBehavior::Success));
        let runner = Arc::new(MigrationRunner::new(task.clone()));

        runner.start_if_enabled(true);
        assert_eq!(
            wait_for_completion(&runner).await,
            MigrationState::Completed(MigrationOutcome::Succeeded)
        );
        assert_eq!(task.runs(), 1);
    }

    #[tokio::test]
    async fn failure_is_recorded_not_propagated() {
        let task = Arc::new(MockMigration::new(MockBehavior::Fail(
            "backfill step 3 exploded".to_string(),
        )));
        let runner = Arc::new(MigrationRunner::new(task));

        runner.start_if_enabled(true);
        match wait_for_completion(&runner).await {
            MigrationState::Completed(MigrationOutcome::Failed(msg)) => {
                assert!(msg.contains("backfill step 3"));
            }
            other => panic!("expected failed completion, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn starts_at_most_once() {
        let task = Arc::new(MockMigration::new(MockBehavior::Success));
        let runner = Arc::new(MigrationRunner::new(task.clone()));

        runner.start_if_enabled(true);
        runner.start_if_enabled(true);
        wait_for_completion(&runner).await;

        assert_eq!(task.runs(), 1);
    }

    #[tokio::test]
    async fn interrupt_aborts_a_hanging_task() {
        let task = Arc::new(MockMigration::new(MockBehavior::Hang));
        let runner = Arc::new(MigrationRunner::new(task));

        runner.start_if_enabled(true);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(runner.state(), MigrationState::Running);

        runner.interrupt().await;
        assert_eq!(
            runner.state(),
            MigrationState::Completed(MigrationOutcome::Failed(
                "interrupted by shutdown".to_string()
            ))
        );
    }
}
