//! Consumer runtime properties against the in-process queue adapter:
//! concurrency ceilings, queue independence and rate-limited starts.

use conductor_core::application::ConsumerRuntime;
use conductor_core::domain::{ConsumerConfig, DrainOutcome, QueueName, RateLimit};
use conductor_core::port::job_handler::mocks::MockJobHandler;
use conductor_infra_memory::MemoryQueue;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

#[tokio::test]
async fn concurrency_ceiling_holds_under_load() {
    let queue = Arc::new(MemoryQueue::new());
    for i in 0..10 {
        queue.push(QueueName::Ingestion, json!({"batch": i}));
    }

    let handler = MockJobHandler::new_slow(Duration::from_millis(80));
    let runtime = ConsumerRuntime::start(
        QueueName::Ingestion,
        queue.clone(),
        handler.clone(),
        ConsumerConfig::new(3).unwrap(),
    );

    sleep(Duration::from_millis(800)).await;

    assert_eq!(handler.calls(), 10, "all jobs processed");
    assert!(
        handler.max_in_flight() <= 3,
        "ceiling violated: {} jobs ran simultaneously with concurrency 3",
        handler.max_in_flight()
    );
    assert_eq!(queue.depth(QueueName::Ingestion), 0);
    assert_eq!(queue.in_flight(QueueName::Ingestion), 0);

    assert_eq!(runtime.stop(Duration::from_secs(1)).await, DrainOutcome::Clean);
}

#[tokio::test]
async fn saturated_queue_does_not_starve_another() {
    let queue = Arc::new(MemoryQueue::new());
    for i in 0..5 {
        queue.push(QueueName::BatchExport, json!({"export": i}));
    }
    for i in 0..3 {
        queue.push(QueueName::TraceUpsert, json!({"trace": i}));
    }

    let slow = MockJobHandler::new_slow(Duration::from_millis(300));
    let fast = MockJobHandler::new_success();

    let exports = ConsumerRuntime::start(
        QueueName::BatchExport,
        queue.clone(),
        slow,
        ConsumerConfig::new(1).unwrap(),
    );
    let upserts = ConsumerRuntime::start(
        QueueName::TraceUpsert,
        queue.clone(),
        fast.clone(),
        ConsumerConfig::new(2).unwrap(),
    );

    sleep(Duration::from_millis(500)).await;

    // Exports are still grinding through their backlog, upserts are done
    assert_eq!(fast.calls(), 3, "fast queue starved by the saturated one");
    assert_eq!(queue.depth(QueueName::TraceUpsert), 0);

    exports.stop(Duration::from_secs(2)).await;
    assert_eq!(upserts.stop(Duration::from_secs(1)).await, DrainOutcome::Clean);
}

#[tokio::test]
async fn rate_limit_spaces_starts_despite_free_slots() {
    // The spec scenario scaled down: concurrency 2, limiter 1 per window,
    // three jobs submitted together. The second and third starts must wait
    // out a full window each even though a slot is free.
    let window = Duration::from_millis(600);
    let queue = Arc::new(MemoryQueue::new());
    for name in ["J1", "J2", "J3"] {
        queue.push(QueueName::BatchExport, json!({"job": name}));
    }

    let handler = MockJobHandler::new_success();
    let runtime = ConsumerRuntime::start(
        QueueName::BatchExport,
        queue.clone(),
        handler.clone(),
        ConsumerConfig::new(2)
            .unwrap()
            .with_rate_limit(RateLimit::new(1, window.as_millis() as u64).unwrap()),
    );

    sleep(Duration::from_millis(2_000)).await;

    let starts = handler.starts();
    assert_eq!(starts.len(), 3, "all three jobs eventually started");

    let tolerance = Duration::from_millis(100);
    for pair in starts.windows(2) {
        let gap = pair[1].duration_since(pair[0]);
        assert!(
            gap + tolerance >= window,
            "starts only {gap:?} apart with a {window:?} window"
        );
    }

    assert_eq!(queue.depth(QueueName::BatchExport), 0);
    assert_eq!(runtime.stop(Duration::from_secs(1)).await, DrainOutcome::Clean);
}

#[tokio::test]
async fn rate_limited_queue_still_respects_concurrency() {
    // Window wide open (high max), concurrency is the binding constraint
    let queue = Arc::new(MemoryQueue::new());
    for i in 0..6 {
        queue.push(QueueName::LegacyIngestion, json!({"i": i}));
    }

    let handler = MockJobHandler::new_slow(Duration::from_millis(80));
    let runtime = ConsumerRuntime::start(
        QueueName::LegacyIngestion,
        queue.clone(),
        handler.clone(),
        ConsumerConfig::new(2)
            .unwrap()
            .with_rate_limit(RateLimit::new(100, 1_000).unwrap()),
    );

    sleep(Duration::from_millis(600)).await;

    assert_eq!(handler.calls(), 6);
    assert!(handler.max_in_flight() <= 2);

    assert_eq!(runtime.stop(Duration::from_secs(1)).await, DrainOutcome::Clean);
}
