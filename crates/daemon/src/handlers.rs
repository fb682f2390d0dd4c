//! Job handler wiring.
//!
//! The real processors (evaluation scoring, export generation, usage
//! aggregation, ...) are external collaborators that implement the
//! `JobHandler` port. This table is the seam where they plug in; until a
//! processor is wired for a queue, deliveries are logged and acknowledged
//! so the orchestration layer can run end to end.

use async_trait::async_trait;
use conductor_core::domain::{Job, QueueName};
use conductor_core::port::JobHandler;
use conductor_core::Result;
use std::sync::Arc;
use tracing::debug;

struct AcknowledgingHandler {
    queue: QueueName,
}

#[async_trait]
impl JobHandler for AcknowledgingHandler {
    async fn handle(&self, job: &Job) -> Result<()> {
        debug!(
            queue = %self.queue,
            job_id = %job.id,
            attempts = job.attempts,
            "job delivered (no processor wired for this queue)"
        );
        Ok(())
    }
}

pub fn handler_for(queue: QueueName) -> Arc<dyn JobHandler> {
    Arc::new(AcknowledgingHandler { queue })
}
