// Application Layer - Consumer orchestration

pub mod consumer;
pub mod migration;
pub mod registry;
pub mod shutdown;

// Re-exports
pub use consumer::{ConsumerRuntime, RateGate};
pub use migration::{MigrationOutcome, MigrationRunner, MigrationState};
pub use registry::{ConsumerRegistry, RegistryEntry};
pub use shutdown::{
    shutdown_channel, ShutdownCoordinator, ShutdownPhase, ShutdownSender, ShutdownSignal,
    ShutdownToken,
};
