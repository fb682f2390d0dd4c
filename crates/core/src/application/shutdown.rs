// Shutdown: token plumbing and the drain coordinator

use crate::application::migration::MigrationRunner;
use crate::application::registry::ConsumerRegistry;
use crate::domain::DrainOutcome;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};

/// Shutdown signal for graceful termination
#[derive(Clone)]
pub struct ShutdownToken {
    rx: watch::Receiver<bool>,
}

impl ShutdownToken {
    /// Check if shutdown was requested
    pub fn is_shutdown(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait for shutdown signal
    pub async fn wait(&mut self) {
        let _ = self.rx.changed().await;
    }
}

/// Shutdown sender
pub struct ShutdownSender {
    tx: watch::Sender<bool>,
}

impl ShutdownSender {
    /// Signal shutdown to all listeners
    pub fn shutdown(&self) {
        let _ = self.tx.send(true);
    }
}

/// Create a shutdown channel
pub fn shutdown_channel() -> (ShutdownSender, ShutdownToken) {
    let (tx, rx) = watch::channel(false);
    (ShutdownSender { tx }, ShutdownToken { rx })
}

/// Termination signal delivered by the OS, narrowed to the two we handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    Interrupt,
    Terminate,
}

impl std::fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShutdownSignal::Interrupt => write!(f, "SIGINT"),
            ShutdownSignal::Terminate => write!(f, "SIGTERM"),
        }
    }
}

/// Coordinator state machine: Idle -> Draining -> Exited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownPhase {
    Idle,
    Draining,
    Exited,
}

const PHASE_IDLE: u8 = 0;
const PHASE_DRAINING: u8 = 1;
const PHASE_EXITED: u8 = 2;

/// Drains all registered consumers exactly once.
///
/// Only the Idle state accepts a signal; anything arriving while Draining
/// or Exited is a no-op, which is what makes SIGINT followed by SIGTERM
/// safe. Idempotence lives here, not in the OS signal adapter.
pub struct ShutdownCoordinator {
    registry: Arc<ConsumerRegistry>,
    migrations: Arc<MigrationRunner>,
    grace: Duration,
    phase: AtomicU8,
}

impl ShutdownCoordinator {
    pub fn new(
        registry: Arc<ConsumerRegistry>,
        migrations: Arc<MigrationRunner>,
        grace: Duration,
    ) -> Self {
        Self {
            registry,
            migrations,
            grace,
            phase: AtomicU8::new(PHASE_IDLE),
        }
    }

    pub fn phase(&self) -> ShutdownPhase {
        match self.phase.load(Ordering::SeqCst) {
            PHASE_DRAINING => ShutdownPhase::Draining,
            PHASE_EXITED => ShutdownPhase::Exited,
            _ => ShutdownPhase::Idle,
        }
    }

    /// Run the drain sequence for a termination signal.
    ///
    /// Walks the registry in registration order and stops every consumer
    /// with the configured grace period. One consumer failing to stop is
    /// logged and treated as forced; it never blocks the others.
    pub async fn drain(&self, signal: ShutdownSignal) {
        if self
            .phase
            .compare_exchange(PHASE_IDLE, PHASE_DRAINING, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            info!(signal = %signal, "shutdown already in progress, ignoring signal");
            return;
        }

        info!(
            signal = %signal,
            consumers = self.registry.len(),
            grace_ms = self.grace.as_millis() as u64,
            "shutdown initiated, draining consumers"
        );

        for entry in self.registry.all() {
            let handle = Arc::clone(&entry.handle);
            let grace = self.grace;

            // Spawned so a panicking stop surfaces as a JoinError here
            // instead of aborting the remaining consumers.
            let outcome = match tokio::spawn(async move { handle.stop(grace).await }).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(queue = %entry.queue, error = ?e, "consumer stop failed, treating as forced");
                    DrainOutcome::Forced
                }
            };

            match outcome {
                DrainOutcome::Clean => info!(queue = %entry.queue, "consumer stopped cleanly"),
                DrainOutcome::Forced => warn!(queue = %entry.queue, "consumer force-stopped"),
            }
        }

        self.migrations.interrupt().await;

        self.phase.store(PHASE_EXITED, Ordering::SeqCst);
        info!("shutdown complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::registry::ConsumerRegistry;
    use crate::domain::{ConsumerConfig, Job, QueueName};
    use crate::port::job_handler::mocks::MockJobHandler;
    use crate::port::migration::mocks::{MockBehavior, MockMigration};
    use crate::port::queue_source::mocks::MockQueueSource;
    use std::sync::Arc;

    fn coordinator_with_empty_registry() -> ShutdownCoordinator {
        let registry = Arc::new(ConsumerRegistry::new());
        let migrations = Arc::new(MigrationRunner::new(Arc::new(MockMigration::new(
            MockBehavior::Success,
        ))));
        ShutdownCoordinator::new(registry, migrations, Duration::from_millis(100))
    }

    #[tokio::test]
    async fn empty_registry_drains_to_exited() {
        let coordinator = coordinator_with_empty_registry();
        assert_eq!(coordinator.phase(), ShutdownPhase::Idle);

        coordinator.drain(ShutdownSignal::Interrupt).await;
        assert_eq!(coordinator.phase(), ShutdownPhase::Exited);
    }

    #[tokio::test]
    async fn second_signal_is_a_noop() {
        let registry = Arc::new(ConsumerRegistry::new());
        let source = Arc::new(MockQueueSource::new());
        source.push(Job::new("j1", QueueName::Ingestion, serde_json::json!({}), 0));
        let handler = MockJobHandler::new_success();

        registry
            .register(
                QueueName::Ingestion,
                source.clone(),
                handler,
                ConsumerConfig::new(1).unwrap(),
            )
            .unwrap();

        let migrations = Arc::new(MigrationRunner::new(Arc::new(MockMigration::new(
            MockBehavior::Success,
        ))));
        let coordinator =
            ShutdownCoordinator::new(registry, migrations, Duration::from_millis(500));

        coordinator.drain(ShutdownSignal::Interrupt).await;
        assert_eq!(coordinator.phase(), ShutdownPhase::Exited);

        // SIGTERM arriving after SIGINT: must not restart the sequence
        coordinator.drain(ShutdownSignal::Terminate).await;
        assert_eq!(coordinator.phase(), ShutdownPhase::Exited);
    }
}
