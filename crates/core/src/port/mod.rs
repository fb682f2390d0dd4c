// Port Layer - Interfaces for external collaborators

pub mod job_handler;
pub mod migration;
pub mod queue_source;

// Re-exports
pub use job_handler::JobHandler;
pub use migration::BackgroundMigration;
pub use queue_source::QueueSource;
