// Background Migration Port (Interface)
//
// Long-running schema/data maintenance executed once at boot. Best-effort:
// the runner records and logs the outcome, the process never exits over it.

use crate::error::Result;
use async_trait::async_trait;

/// A self-contained background maintenance task
#[async_trait]
pub trait BackgroundMigration: Send + Sync {
    /// Stable name used in logs
    fn name(&self) -> &str;

    /// Run the migration to completion
    async fn run(&self) -> Result<()>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone)]
    pub enum MockBehavior {
        Success,
        Fail(String),
        /// Never completes (for interrupt testing)
        Hang,
    }

    pub struct MockMigration {
        behavior: MockBehavior,
        runs: AtomicUsize,
    }

    impl MockMigration {
        pub fn new(behavior: MockBehavior) -> Self {
            Self {
                behavior,
                runs: AtomicUsize::new(0),
            }
        }

        pub fn runs(&self) -> usize {
            self.runs.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl BackgroundMigration for MockMigration {
        fn name(&self) -> &str {
            "mock-migration"
        }

        async fn run(&self) -> Result<()> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            match &self.behavior {
                MockBehavior::Success => Ok(()),
                MockBehavior::Fail(msg) => Err(AppError::Internal(msg.clone())),
                MockBehavior::Hang => {
                    std::future::pending::<()>().await;
                    Ok(())
                }
            }
        }
    }
}
