// Consumer Configuration Domain Model

use crate::error::{AppError, Result};
use std::time::Duration;

/// Throughput throttle: at most `max_jobs` job starts within any rolling
/// window of `window_ms`, layered on top of the concurrency bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    max_jobs: u32,
    window_ms: u64,
}

impl RateLimit {
    pub fn new(max_jobs: u32, window_ms: u64) -> Result<Self> {
        if max_jobs < 1 {
            return Err(AppError::Config(
                "rate limit max_jobs must be >= 1".to_string(),
            ));
        }
        if window_ms == 0 {
            return Err(AppError::Config(
                "rate limit window_ms must be > 0".to_string(),
            ));
        }
        Ok(Self { max_jobs, window_ms })
    }

    pub fn max_jobs(&self) -> u32 {
        self.max_jobs
    }

    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

/// Immutable per-queue execution policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsumerConfig {
    concurrency: usize,
    rate_limit: Option<RateLimit>,
}

impl ConsumerConfig {
    pub fn new(concurrency: usize) -> Result<Self> {
        if concurrency < 1 {
            return Err(AppError::Config("concurrency must be >= 1".to_string()));
        }
        Ok(Self {
            concurrency,
            rate_limit: None,
        })
    }

    pub fn with_rate_limit(mut self, rate_limit: RateLimit) -> Self {
        self.rate_limit = Some(rate_limit);
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn rate_limit(&self) -> Option<&RateLimit> {
        self.rate_limit.as_ref()
    }
}

/// Result of draining one consumer during shutdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// All in-flight jobs finished within the grace period
    Clean,
    /// Grace period elapsed, remaining slots were force-released
    Forced,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_concurrency() {
        assert!(ConsumerConfig::new(0).is_err());
        assert!(ConsumerConfig::new(1).is_ok());
    }

    #[test]
    fn rejects_invalid_rate_limit() {
        assert!(RateLimit::new(0, 1000).is_err());
        assert!(RateLimit::new(1, 0).is_err());

        let rl = RateLimit::new(5, 1000).unwrap();
        assert_eq!(rl.max_jobs(), 5);
        assert_eq!(rl.window(), Duration::from_millis(1000));
    }
}
