// Job Domain Model
//
// The job is deliberately thin: payload semantics belong to the handler,
// retry/backoff state belongs to the queue transport. The consumer runtime
// only needs identity and routing.

use crate::domain::QueueName;
use serde::{Deserialize, Serialize};

/// Job ID (assigned by the queue transport)
pub type JobId = String;

/// One unit of work delivered by a queue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub queue: QueueName,
    pub payload: serde_json::Value,

    /// Delivery attempts so far, maintained by the queue transport
    pub attempts: u32,
    pub enqueued_at: i64, // epoch ms
}

impl Job {
    pub fn new(
        id: impl Into<JobId>,
        queue: QueueName,
        payload: serde_json::Value,
        enqueued_at: i64,
    ) -> Self {
        Self {
            id: id.into(),
            queue,
            payload,
            attempts: 0,
            enqueued_at,
        }
    }
}
