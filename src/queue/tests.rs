use crate::queue::InMemorySyncQueue;
use crate::retry::RetryPolicy;
use crate::traits::queue::{Lane, SyncOperation, SyncQueue};
use std::collections::HashMap;
use std::sync::Arc;

fn queue_with(max_retries: u32, backoff_base_seconds: u64) -> InMemorySyncQueue {
    InMemorySyncQueue::new(RetryPolicy::new(max_retries, backoff_base_seconds))
}

#[tokio::test]
async fn test_enqueue_dequeue_fifo() {
    let queue = queue_with(3, 2);

    let first = queue
        .enqueue(SyncOperation::Create, "sku-1", HashMap::new())
        .await
        .unwrap();
    let second = queue
        .enqueue(SyncOperation::Update, "sku-2", HashMap::new())
        .await
        .unwrap();

    let job = queue.dequeue().await.unwrap().unwrap();
    assert_eq!(job.id, first);
    assert_eq!(job.operation, SyncOperation::Create);
    assert_eq!(job.external_product_id, "sku-1");
    assert_eq!(job.attempts, 0);

    let job = queue.dequeue().await.unwrap().unwrap();
    assert_eq!(job.id, second);
}

#[tokio::test]
async fn test_dequeue_empty_returns_none() {
    let queue = queue_with(3, 2);
    assert!(queue.dequeue().await.unwrap().is_none());
}

#[tokio::test]
async fn test_dequeue_moves_job_to_in_flight() {
    let queue = queue_with(3, 2);
    queue
        .enqueue(SyncOperation::Create, "sku-1", HashMap::new())
        .await
        .unwrap();

    let stats = queue.stats().await.unwrap();
    assert_eq!(stats.pending, 1);
    assert_eq!(stats.in_flight, 0);

    queue.dequeue().await.unwrap().unwrap();

    let stats = queue.stats().await.unwrap();
    assert_eq!(stats.pending, 0);
    assert_eq!(stats.in_flight, 1);
    assert_eq!(stats.dead_letter, 0);
}

#[tokio::test]
async fn test_no_job_dequeued_twice() {
    let queue = Arc::new(queue_with(3, 2));
    for i in 0..3 {
        queue
            .enqueue(SyncOperation::Create, &format!("sku-{}", i), HashMap::new())
            .await
            .unwrap();
    }

    // More concurrent dequeuers than jobs: every job id must come out once
    let mut handles = Vec::new();
    for _ in 0..8 {
        let queue = queue.clone();
        handles.push(tokio::spawn(async move { queue.dequeue().await.unwrap() }));
    }

    let mut seen = Vec::new();
    for handle in handles {
        if let Some(job) = handle.await.unwrap() {
            seen.push(job.id);
        }
    }

    seen.sort();
    seen.dedup();
    assert_eq!(seen.len(), 3, "each job must be dequeued exactly once");
}

#[tokio::test]
async fn test_complete_is_idempotent() {
    let queue = queue_with(3, 2);
    let job_id = queue
        .enqueue(SyncOperation::Create, "sku-1", HashMap::new())
        .await
        .unwrap();
    queue.dequeue().await.unwrap().unwrap();

    queue.complete(&job_id).await.unwrap();
    // Second completion and unknown ids are no-ops
    queue.complete(&job_id).await.unwrap();
    queue.complete("no-such-job").await.unwrap();

    let stats = queue.stats().await.unwrap();
    assert_eq!(stats.total(), 0);
}

#[tokio::test]
async fn test_failed_job_waits_out_backoff() {
    // Base 2: first retry is due 2 seconds out, so it must not be visible yet
    let queue = queue_with(3, 2);
    let job_id = queue
        .enqueue(SyncOperation::Update, "sku-1", HashMap::new())
        .await
        .unwrap();
    queue.dequeue().await.unwrap().unwrap();
    queue.fail(&job_id, "upstream 503").await.unwrap();

    assert!(queue.dequeue().await.unwrap().is_none());

    // Still owned by the pending lane while delayed
    let stats = queue.stats().await.unwrap();
    assert_eq!(stats.pending, 1);
    assert_eq!(stats.in_flight, 0);
}

#[tokio::test]
async fn test_failed_job_retries_with_incremented_attempts() {
    // Base 0 collapses the backoff so the retry is immediately visible
    let queue = queue_with(3, 0);
    let job_id = queue
        .enqueue(SyncOperation::Update, "sku-1", HashMap::new())
        .await
        .unwrap();
    queue.dequeue().await.unwrap().unwrap();
    queue.fail(&job_id, "upstream 503").await.unwrap();

    let retried = queue.dequeue().await.unwrap().unwrap();
    assert_eq!(retried.id, job_id);
    assert_eq!(retried.attempts, 1);
    assert_eq!(retried.error.as_deref(), Some("upstream 503"));
}

#[tokio::test]
async fn test_dead_letter_after_max_retries() {
    let queue = queue_with(2, 0);
    let job_id = queue
        .enqueue(SyncOperation::Create, "sku-1", HashMap::new())
        .await
        .unwrap();

    for _ in 0..2 {
        queue.dequeue().await.unwrap().unwrap();
        queue.fail(&job_id, "still broken").await.unwrap();
    }

    // Exhausted: in the dead-letter lane and nowhere else
    assert!(queue.dequeue().await.unwrap().is_none());
    let stats = queue.stats().await.unwrap();
    assert_eq!(stats.pending, 0);
    assert_eq!(stats.in_flight, 0);
    assert_eq!(stats.dead_letter, 1);
}

#[tokio::test]
async fn test_fail_unknown_job_is_noop() {
    let queue = queue_with(3, 2);
    queue.fail("no-such-job", "boom").await.unwrap();
    assert_eq!(queue.stats().await.unwrap().total(), 0);
}

#[tokio::test]
async fn test_requeue_dead_letter_resets_jobs() {
    let queue = queue_with(1, 0);
    let job_id = queue
        .enqueue(SyncOperation::Delete, "sku-1", HashMap::new())
        .await
        .unwrap();
    queue.dequeue().await.unwrap().unwrap();
    queue.fail(&job_id, "fatal payload").await.unwrap();

    assert_eq!(queue.stats().await.unwrap().dead_letter, 1);

    let moved = queue.requeue_dead_letter().await.unwrap();
    assert_eq!(moved, 1);

    let stats = queue.stats().await.unwrap();
    assert_eq!(stats.dead_letter, 0);
    assert_eq!(stats.pending, 1);

    let job = queue.dequeue().await.unwrap().unwrap();
    assert_eq!(job.id, job_id);
    assert_eq!(job.attempts, 0);
    assert!(job.error.is_none());
}

#[tokio::test]
async fn test_drain_lanes() {
    let queue = queue_with(1, 0);

    // One job per lane: pending, in-flight, dead-letter
    let dead_id = queue
        .enqueue(SyncOperation::Create, "sku-dead", HashMap::new())
        .await
        .unwrap();
    queue.dequeue().await.unwrap().unwrap();
    queue.fail(&dead_id, "broken").await.unwrap();

    queue
        .enqueue(SyncOperation::Create, "sku-flight", HashMap::new())
        .await
        .unwrap();
    queue.dequeue().await.unwrap().unwrap();

    queue
        .enqueue(SyncOperation::Create, "sku-pending", HashMap::new())
        .await
        .unwrap();

    assert_eq!(queue.drain(Lane::Pending).await.unwrap(), 1);
    assert_eq!(queue.drain(Lane::InFlight).await.unwrap(), 1);
    assert_eq!(queue.drain(Lane::DeadLetter).await.unwrap(), 1);
    assert_eq!(queue.stats().await.unwrap().total(), 0);
}

#[tokio::test]
async fn test_job_count_conserved_across_transitions() {
    // Drive one job through every lane transition; the total only drops on
    // complete
    let queue = queue_with(2, 0);
    let job_id = queue
        .enqueue(SyncOperation::Update, "sku-1", HashMap::new())
        .await
        .unwrap();
    let second_id = queue
        .enqueue(SyncOperation::Update, "sku-2", HashMap::new())
        .await
        .unwrap();
    assert_eq!(queue.stats().await.unwrap().total(), 2);

    // pending -> in-flight -> retry-delayed
    let job = queue.dequeue().await.unwrap().unwrap();
    assert_eq!(job.id, job_id);
    queue.fail(&job_id, "x").await.unwrap();
    assert_eq!(queue.stats().await.unwrap().total(), 2);

    // The promoted retry re-enters behind the untouched second job
    let job = queue.dequeue().await.unwrap().unwrap();
    assert_eq!(job.id, second_id);
    queue.complete(&job.id).await.unwrap();
    assert_eq!(queue.stats().await.unwrap().total(), 1);

    let job = queue.dequeue().await.unwrap().unwrap();
    assert_eq!(job.id, job_id);
    assert_eq!(job.attempts, 1);
    queue.fail(&job_id, "x").await.unwrap();
    let stats = queue.stats().await.unwrap();
    assert_eq!(stats.total(), 1);
    assert_eq!(stats.dead_letter, 1);

    // dead-letter -> pending -> in-flight -> completed
    queue.requeue_dead_letter().await.unwrap();
    assert_eq!(queue.stats().await.unwrap().total(), 1);
    let job = queue.dequeue().await.unwrap().unwrap();
    queue.complete(&job.id).await.unwrap();
    assert_eq!(queue.stats().await.unwrap().total(), 0);
}
