// Consumer Runtime - per-queue pull loop with bounded concurrency

pub mod constants;
mod rate_gate;

pub use rate_gate::RateGate;

use constants::*;

use crate::application::shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};
use crate::domain::{ConsumerConfig, DrainOutcome, Job, QueueName};
use crate::port::{JobHandler, QueueSource};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

/// Active subscription to one queue.
///
/// Owns the pull loop task, the worker slot semaphore and the optional
/// rate gate. Constructed and started by the registry, destroyed only via
/// `stop` during the shutdown sequence.
pub struct ConsumerRuntime {
    queue: QueueName,
    concurrency: u32,
    slots: Arc<Semaphore>,
    shutdown: ShutdownSender,
    pull_loop: Mutex<Option<JoinHandle<()>>>,
}

impl ConsumerRuntime {
    /// Build the runtime and start its pull loop immediately.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        queue: QueueName,
        source: Arc<dyn QueueSource>,
        handler: Arc<dyn JobHandler>,
        config: ConsumerConfig,
    ) -> Self {
        let slots = Arc::new(Semaphore::new(config.concurrency()));
        let gate = config
            .rate_limit()
            .map(|rl| Arc::new(RateGate::new(rl.max_jobs(), rl.window())));

        let (shutdown, token) = shutdown_channel();

        let pull_loop = PullLoop {
            queue,
            source,
            handler,
            slots: Arc::clone(&slots),
            gate,
        };
        let handle = tokio::spawn(pull_loop.run(token));

        Self {
            queue,
            concurrency: config.concurrency() as u32,
            slots,
            shutdown,
            pull_loop: Mutex::new(Some(handle)),
        }
    }

    pub fn queue(&self) -> QueueName {
        self.queue
    }

    /// Stop pulling new jobs, then wait up to `grace` for jobs already in
    /// flight. On timeout the remaining slots are force-released and the
    /// abandoned jobs become the queue transport's redelivery problem.
    ///
    /// The whole drain shares one grace budget: a pull loop stuck inside a
    /// slow transport fetch is aborted when the budget runs out, so one
    /// dead broker connection cannot stall the shutdown sequence.
    pub async fn stop(&self, grace: Duration) -> DrainOutcome {
        self.shutdown.shutdown();
        let deadline = tokio::time::Instant::now() + grace;

        let handle = self.pull_loop.lock().unwrap().take();
        if let Some(mut handle) = handle {
            match tokio::time::timeout_at(deadline, &mut handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    error!(queue = %self.queue, error = ?e, "pull loop terminated abnormally");
                }
                Err(_elapsed) => {
                    handle.abort();
                    let _ = handle.await;
                    self.slots.close();
                    warn!(
                        queue = %self.queue,
                        grace_ms = grace.as_millis() as u64,
                        "pull loop still fetching past the grace period, aborted"
                    );
                    return DrainOutcome::Forced;
                }
            }
        }

        // Draining means re-acquiring every worker slot, within what is
        // left of the budget
        let all_slots = Arc::clone(&self.slots).acquire_many_owned(self.concurrency);
        match tokio::time::timeout_at(deadline, all_slots).await {
            Ok(Ok(_permits)) => {
                debug!(queue = %self.queue, "drain completed within grace period");
                DrainOutcome::Clean
            }
            Ok(Err(_closed)) => DrainOutcome::Forced,
            Err(_elapsed) => {
                self.slots.close();
                warn!(
                    queue = %self.queue,
                    grace_ms = grace.as_millis() as u64,
                    "drain grace period exceeded, force-releasing slots"
                );
                DrainOutcome::Forced
            }
        }
    }
}

/// State moved into the pull loop task
struct PullLoop {
    queue: QueueName,
    source: Arc<dyn QueueSource>,
    handler: Arc<dyn JobHandler>,
    slots: Arc<Semaphore>,
    gate: Option<Arc<RateGate>>,
}

impl PullLoop {
    async fn run(self, mut token: ShutdownToken) {
        info!(
            queue = %self.queue,
            slots = self.slots.available_permits(),
            rate_limited = self.gate.is_some(),
            "consumer started"
        );

        loop {
            if token.is_shutdown() {
                break;
            }

            // One permit per in-flight job; waiting here is the
            // concurrency bound in action.
            let permit = tokio::select! {
                acquired = Arc::clone(&self.slots).acquire_owned() => match acquired {
                    Ok(permit) => permit,
                    Err(_closed) => break,
                },
                _ = token.wait() => break,
            };

            match self.source.fetch(&self.queue).await {
                Ok(Some(job)) => {
                    if let Some(gate) = &self.gate {
                        let admitted = tokio::select! {
                            _ = gate.admit() => true,
                            _ = token.wait() => false,
                        };
                        if !admitted {
                            // Shutdown won the race before the job started
                            self.report_failure(&job, "consumer stopped before job start")
                                .await;
                            break;
                        }
                    }
                    self.dispatch(job, permit);
                }
                Ok(None) => {
                    drop(permit);
                    if !pause(IDLE_SLEEP_DURATION, &mut token).await {
                        break;
                    }
                }
                Err(e) => {
                    error!(queue = %self.queue, error = %e, "job fetch failed");
                    drop(permit);
                    if !pause(ERROR_RECOVERY_SLEEP_DURATION, &mut token).await {
                        break;
                    }
                }
            }
        }

        info!(queue = %self.queue, "consumer pull loop stopped");
    }

    /// Run the handler on its own task; the permit rides along and frees
    /// the slot when the job finishes either way.
    fn dispatch(&self, job: Job, permit: OwnedSemaphorePermit) {
        let queue = self.queue;
        let source = Arc::clone(&self.source);
        let handler = Arc::clone(&self.handler);

        tokio::spawn(async move {
            let _permit = permit;
            let job = Arc::new(job);

            // Inner spawn isolates handler panics: they surface as a
            // JoinError instead of unwinding through the slot bookkeeping.
            let exec = {
                let handler = Arc::clone(&handler);
                let job = Arc::clone(&job);
                tokio::spawn(async move { handler.handle(&job).await })
            };

            match exec.await {
                Ok(Ok(())) => {
                    debug!(queue = %queue, job_id = %job.id, "job completed");
                    if let Err(e) = source.ack(&queue, &job).await {
                        error!(queue = %queue, job_id = %job.id, error = %e, "job ack failed");
                    }
                }
                Ok(Err(e)) => {
                    warn!(queue = %queue, job_id = %job.id, error = %e, "job handler failed");
                    report(&source, &queue, &job, &e.to_string()).await;
                }
                Err(join_err) => {
                    if join_err.is_panic() {
                        error!(queue = %queue, job_id = %job.id, "job handler panicked");
                    } else {
                        error!(queue = %queue, job_id = %job.id, "job handler cancelled");
                    }
                    report(&source, &queue, &job, "handler panicked").await;
                }
            }
        });
    }

    async fn report_failure(&self, job: &Job, reason: &str) {
        report(&self.source, &self.queue, job, reason).await;
    }
}

async fn report(source: &Arc<dyn QueueSource>, queue: &QueueName, job: &Job, reason: &str) {
    if let Err(e) = source.report_failure(queue, job, reason).await {
        error!(queue = %queue, job_id = %job.id, error = %e, "failure report did not reach the queue");
    }
}

/// Sleep that a shutdown signal can cut short; false means shut down
async fn pause(duration: Duration, token: &mut ShutdownToken) -> bool {
    tokio::select! {
        _ = sleep(duration) => true,
        _ = token.wait() => false,
    }
}
