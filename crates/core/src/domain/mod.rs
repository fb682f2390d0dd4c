// Domain Layer - Pure types, no runtime state

pub mod consumer;
pub mod job;
pub mod queue;

// Re-exports
pub use consumer::{ConsumerConfig, DrainOutcome, RateLimit};
pub use job::{Job, JobId};
pub use queue::QueueName;
