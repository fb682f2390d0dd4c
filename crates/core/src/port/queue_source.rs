// Queue Source Port (Interface)
//
// Abstraction over the durable job queue. The transport owns persistence,
// ordering and retry/backoff policy; the consumer runtime only fetches,
// acknowledges and reports failures.

use crate::domain::{Job, QueueName};
use crate::error::Result;
use async_trait::async_trait;

/// Durable queue transport interface
#[async_trait]
pub trait QueueSource: Send + Sync {
    /// Fetch the next available job for a queue, if any
    async fn fetch(&self, queue: &QueueName) -> Result<Option<Job>>;

    /// Acknowledge a successfully processed job (removes it from the queue)
    async fn ack(&self, queue: &QueueName, job: &Job) -> Result<()>;

    /// Report a failed job back to the queue; redelivery is the
    /// transport's decision, the consumer never retries on its own
    async fn report_failure(&self, queue: &QueueName, job: &Job, reason: &str) -> Result<()>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Scriptable in-memory queue source for unit tests.
    ///
    /// Jobs are handed out in push order; acks and failure reports are
    /// recorded for assertions.
    #[derive(Default)]
    pub struct MockQueueSource {
        jobs: Mutex<VecDeque<Job>>,
        acked: Mutex<Vec<String>>,
        failed: Mutex<Vec<(String, String)>>,
        fail_fetch: Mutex<bool>,
        stall_fetch: Mutex<bool>,
    }

    impl MockQueueSource {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn push(&self, job: Job) {
            self.jobs.lock().unwrap().push_back(job);
        }

        /// Make every subsequent fetch return a transport error
        pub fn break_fetch(&self) {
            *self.fail_fetch.lock().unwrap() = true;
        }

        /// Make every subsequent fetch block forever (dead broker)
        pub fn stall_fetch(&self) {
            *self.stall_fetch.lock().unwrap() = true;
        }

        pub fn acked(&self) -> Vec<String> {
            self.acked.lock().unwrap().clone()
        }

        pub fn failed(&self) -> Vec<(String, String)> {
            self.failed.lock().unwrap().clone()
        }

        pub fn remaining(&self) -> usize {
            self.jobs.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl QueueSource for MockQueueSource {
        async fn fetch(&self, _queue: &QueueName) -> Result<Option<Job>> {
            if *self.stall_fetch.lock().unwrap() {
                std::future::pending::<()>().await;
            }
            if *self.fail_fetch.lock().unwrap() {
                return Err(AppError::Queue("mock transport down".to_string()));
            }
            Ok(self.jobs.lock().unwrap().pop_front())
        }

        async fn ack(&self, _queue: &QueueName, job: &Job) -> Result<()> {
            self.acked.lock().unwrap().push(job.id.clone());
            Ok(())
        }

        async fn report_failure(&self, _queue: &QueueName, job: &Job, reason: &str) -> Result<()> {
            self.failed
                .lock()
                .unwrap()
                .push((job.id.clone(), reason.to_string()));
            Ok(())
        }
    }
}
