// Queue Consumer Registry
//
// Process-wide table of active consumers. Written during boot by the
// registration loop, read by the shutdown coordinator. Entries are only
// ever removed by stopping the whole process; queue sets are fixed at
// boot from configuration, so there is no unregistration API.

use crate::application::consumer::ConsumerRuntime;
use crate::domain::{ConsumerConfig, QueueName};
use crate::error::{AppError, Result};
use crate::port::{JobHandler, QueueSource};
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use tracing::info;

/// One registered consumer
#[derive(Clone)]
pub struct RegistryEntry {
    pub queue: QueueName,
    pub handle: Arc<ConsumerRuntime>,
    pub registered_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct ConsumerRegistry {
    // Vec keeps registration order for deterministic shutdown logging
    entries: Mutex<Vec<RegistryEntry>>,
}

impl ConsumerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct, start and insert a consumer for `queue`.
    ///
    /// At most one registration per queue per process lifetime; a second
    /// attempt is a wiring bug and fails without touching the first.
    pub fn register(
        &self,
        queue: QueueName,
        source: Arc<dyn QueueSource>,
        handler: Arc<dyn JobHandler>,
        config: ConsumerConfig,
    ) -> Result<RegistryEntry> {
        let mut entries = self.entries.lock().unwrap();
        if entries.iter().any(|e| e.queue == queue) {
            return Err(AppError::DuplicateRegistration(queue));
        }

        let handle = Arc::new(ConsumerRuntime::start(queue, source, handler, config));
        let entry = RegistryEntry {
            queue,
            handle,
            registered_at: Utc::now(),
        };
        entries.push(entry.clone());

        info!(
            queue = %queue,
            concurrency = config.concurrency(),
            rate_limited = config.rate_limit().is_some(),
            "queue consumer registered"
        );
        Ok(entry)
    }

    /// Snapshot of all entries in registration order
    pub fn all(&self) -> Vec<RegistryEntry> {
        self.entries.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
