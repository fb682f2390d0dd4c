// Job Handler Port (Interface)
//
// The business logic executed per job (evaluation scoring, export
// generation, usage aggregation, ...) lives outside this crate. The
// consumer runtime treats a handler as an opaque capability: it either
// succeeds, fails, or panics - and a panic is handled like a failure.

use crate::domain::Job;
use crate::error::Result;
use async_trait::async_trait;

/// One job in, success or reported failure out
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, job: &Job) -> Result<()>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::time::Instant;

    /// Mock handler behavior
    #[derive(Debug, Clone)]
    pub enum MockBehavior {
        /// Always succeed
        Success,
        /// Always fail with message
        Fail(String),
        /// Panic with message (for panic isolation testing)
        Panic(String),
    }

    /// Instrumented mock handler.
    ///
    /// Tracks call counts, start instants and the maximum number of
    /// simultaneously running invocations, which the concurrency and
    /// rate-limit property tests assert on.
    pub struct MockJobHandler {
        behavior: MockBehavior,
        delay: Option<Duration>,
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        starts: Mutex<Vec<Instant>>,
    }

    impl MockJobHandler {
        pub fn new(behavior: MockBehavior) -> Arc<Self> {
            Arc::new(Self {
                behavior,
                delay: None,
                calls: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                starts: Mutex::new(Vec::new()),
            })
        }

        pub fn new_success() -> Arc<Self> {
            Self::new(MockBehavior::Success)
        }

        pub fn new_fail(message: impl Into<String>) -> Arc<Self> {
            Self::new(MockBehavior::Fail(message.into()))
        }

        pub fn new_panicking(message: impl Into<String>) -> Arc<Self> {
            Self::new(MockBehavior::Panic(message.into()))
        }

        /// Succeed after holding a slot for `delay` (slow handler)
        pub fn new_slow(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                behavior: MockBehavior::Success,
                delay: Some(delay),
                calls: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                starts: Mutex::new(Vec::new()),
            })
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn max_in_flight(&self) -> usize {
            self.max_in_flight.load(Ordering::SeqCst)
        }

        pub fn starts(&self) -> Vec<Instant> {
            self.starts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl JobHandler for MockJobHandler {
        async fn handle(&self, _job: &Job) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.starts.lock().unwrap().push(Instant::now());

            let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(running, Ordering::SeqCst);

            let result = match &self.behavior {
                MockBehavior::Success => Ok(()),
                MockBehavior::Fail(msg) => Err(AppError::Handler(msg.clone())),
                MockBehavior::Panic(msg) => {
                    self.in_flight.fetch_sub(1, Ordering::SeqCst);
                    panic!("{}", msg);
                }
            };

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            result
        }
    }
}
