// In-Process Queue Source
//
// Adapter implementing the QueueSource port on plain process memory. This
// is the seam where a durable broker adapter plugs in; the semantics match
// what the consumer runtime expects from one: fetch moves a job to an
// in-flight set, ack drops it, a failure report requeues it for redelivery.

use async_trait::async_trait;
use conductor_core::domain::{Job, JobId, QueueName};
use conductor_core::error::{AppError, Result};
use conductor_core::port::QueueSource;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

#[derive(Default)]
struct QueueState {
    ready: VecDeque<Job>,
    in_flight: HashMap<JobId, Job>,
}

#[derive(Default)]
pub struct MemoryQueue {
    queues: Mutex<HashMap<QueueName, QueueState>>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a payload, producer-side. Returns the assigned job id.
    pub fn push(&self, queue: QueueName, payload: serde_json::Value) -> JobId {
        let id = uuid::Uuid::new_v4().to_string();
        let job = Job::new(
            id.clone(),
            queue,
            payload,
            chrono::Utc::now().timestamp_millis(),
        );
        self.queues
            .lock()
            .unwrap()
            .entry(queue)
            .or_default()
            .ready
            .push_back(job);
        id
    }

    /// Jobs waiting to be fetched
    pub fn depth(&self, queue: QueueName) -> usize {
        self.queues
            .lock()
            .unwrap()
            .get(&queue)
            .map_or(0, |s| s.ready.len())
    }

    /// Jobs fetched but neither acked nor reported failed
    pub fn in_flight(&self, queue: QueueName) -> usize {
        self.queues
            .lock()
            .unwrap()
            .get(&queue)
            .map_or(0, |s| s.in_flight.len())
    }
}

#[async_trait]
impl QueueSource for MemoryQueue {
    async fn fetch(&self, queue: &QueueName) -> Result<Option<Job>> {
        let mut queues = self.queues.lock().unwrap();
        let Some(state) = queues.get_mut(queue) else {
            return Ok(None);
        };
        match state.ready.pop_front() {
            Some(job) => {
                state.in_flight.insert(job.id.clone(), job.clone());
                Ok(Some(job))
            }
            None => Ok(None),
        }
    }

    async fn ack(&self, queue: &QueueName, job: &Job) -> Result<()> {
        let mut queues = self.queues.lock().unwrap();
        let removed = queues
            .get_mut(queue)
            .and_then(|s| s.in_flight.remove(&job.id));
        match removed {
            Some(_) => Ok(()),
            None => Err(AppError::Queue(format!(
                "ack for unknown job '{}' on queue '{}'",
                job.id, queue
            ))),
        }
    }

    async fn report_failure(&self, queue: &QueueName, job: &Job, _reason: &str) -> Result<()> {
        let mut queues = self.queues.lock().unwrap();
        let state = queues.entry(*queue).or_default();
        let mut job = state.in_flight.remove(&job.id).unwrap_or_else(|| job.clone());
        job.attempts += 1;
        // Redelivery at the back; backoff policy would live here in a
        // durable broker adapter
        state.ready.push_back(job);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn fetch_ack_cycle() {
        let q = MemoryQueue::new();
        let id = q.push(QueueName::Ingestion, json!({"batch": 1}));
        assert_eq!(q.depth(QueueName::Ingestion), 1);

        let job = q.fetch(&QueueName::Ingestion).await.unwrap().unwrap();
        assert_eq!(job.id, id);
        assert_eq!(q.depth(QueueName::Ingestion), 0);
        assert_eq!(q.in_flight(QueueName::Ingestion), 1);

        q.ack(&QueueName::Ingestion, &job).await.unwrap();
        assert_eq!(q.in_flight(QueueName::Ingestion), 0);
    }

    #[tokio::test]
    async fn failure_requeues_with_attempt_count() {
        let q = MemoryQueue::new();
        q.push(QueueName::BatchExport, json!({"export": "csv"}));

        let job = q.fetch(&QueueName::BatchExport).await.unwrap().unwrap();
        q.report_failure(&QueueName::BatchExport, &job, "downstream timeout")
            .await
            .unwrap();

        let redelivered = q.fetch(&QueueName::BatchExport).await.unwrap().unwrap();
        assert_eq!(redelivered.id, job.id);
        assert_eq!(redelivered.attempts, 1);
    }

    #[tokio::test]
    async fn queues_are_independent() {
        let q = MemoryQueue::new();
        q.push(QueueName::Ingestion, json!({}));

        assert!(q.fetch(&QueueName::EvalExecution).await.unwrap().is_none());
        assert!(q.fetch(&QueueName::Ingestion).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn ack_of_unknown_job_is_an_error() {
        let q = MemoryQueue::new();
        let stray = Job::new("ghost", QueueName::Ingestion, json!({}), 0);
        assert!(q.ack(&QueueName::Ingestion, &stray).await.is_err());
    }
}
