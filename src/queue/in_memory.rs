//! In-memory sync queue implementation
//!
//! This implementation uses in-memory data structures and is suitable for
//! development, testing, and single-instance deployments.

use crate::error::Result;
use crate::retry::{RetryDecision, RetryPolicy};
use crate::traits::queue::{Lane, QueueStats, SyncJob, SyncOperation, SyncQueue};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// All three lanes plus the delayed-retry set, guarded by one lock
///
/// Keeping every lane behind a single mutex makes each transition one atomic
/// step: a job leaves its old lane and enters its new lane under the same
/// guard, so no interleaving can observe it in neither.
#[derive(Default)]
struct LaneState {
    pending: VecDeque<SyncJob>,
    in_flight: HashMap<String, SyncJob>,
    dead_letter: VecDeque<SyncJob>,
    /// Jobs waiting out a retry backoff, keyed by due time
    delayed: BTreeMap<DateTime<Utc>, Vec<SyncJob>>,
}

impl LaneState {
    /// Move every delayed job whose backoff has elapsed into pending
    fn promote_due(&mut self, now: DateTime<Utc>) {
        let due_keys: Vec<DateTime<Utc>> = self
            .delayed
            .iter()
            .take_while(|(due, _)| **due <= now)
            .map(|(due, _)| *due)
            .collect();

        for key in due_keys {
            if let Some(jobs) = self.delayed.remove(&key) {
                for job in jobs {
                    self.pending.push_back(job);
                }
            }
        }
    }

    fn delayed_count(&self) -> u64 {
        self.delayed.values().map(|jobs| jobs.len() as u64).sum()
    }
}

/// In-memory sync queue
///
/// Jobs live only in process memory; pending retries do not survive a
/// restart. Delayed retries are promoted to pending lazily when `dequeue`
/// runs, rather than by a background timer.
#[derive(Clone)]
pub struct InMemorySyncQueue {
    lanes: Arc<Mutex<LaneState>>,
    retry_policy: RetryPolicy,
    health_status: Arc<AtomicBool>,
}

impl InMemorySyncQueue {
    /// Create a new in-memory sync queue with the given retry policy
    pub fn new(retry_policy: RetryPolicy) -> Self {
        Self {
            lanes: Arc::new(Mutex::new(LaneState::default())),
            retry_policy,
            health_status: Arc::new(AtomicBool::new(true)),
        }
    }
}

impl Default for InMemorySyncQueue {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

#[async_trait]
impl SyncQueue for InMemorySyncQueue {
    async fn enqueue(
        &self,
        operation: SyncOperation,
        external_product_id: &str,
        metadata: HashMap<String, String>,
    ) -> Result<String> {
        let job_id = Uuid::new_v4().to_string();
        let job = SyncJob::new(
            job_id.clone(),
            operation,
            external_product_id.to_string(),
            metadata,
        );

        let mut lanes = self.lanes.lock().await;
        lanes.pending.push_back(job);

        Ok(job_id)
    }

    async fn dequeue(&self) -> Result<Option<SyncJob>> {
        let mut lanes = self.lanes.lock().await;
        lanes.promote_due(Utc::now());

        if let Some(job) = lanes.pending.pop_front() {
            lanes.in_flight.insert(job.id.clone(), job.clone());
            Ok(Some(job))
        } else {
            Ok(None)
        }
    }

    async fn complete(&self, job_id: &str) -> Result<()> {
        let mut lanes = self.lanes.lock().await;
        // Unknown or already-completed ids are a no-op
        lanes.in_flight.remove(job_id);
        Ok(())
    }

    async fn fail(&self, job_id: &str, error: &str) -> Result<()> {
        let mut lanes = self.lanes.lock().await;

        if let Some(mut job) = lanes.in_flight.remove(job_id) {
            let attempts = job.record_failure(error);

            match self.retry_policy.decide(attempts) {
                RetryDecision::Retry { delay } => {
                    // Clamp to a year so a misconfigured base cannot overflow
                    // the due timestamp
                    let secs = delay.as_secs().min(31_536_000) as i64;
                    let due = Utc::now() + Duration::seconds(secs);
                    lanes.delayed.entry(due).or_default().push(job);
                }
                RetryDecision::DeadLetter => {
                    tracing::warn!(
                        job_id = %job.id,
                        attempts = job.attempts,
                        error = %error,
                        "Job exhausted retries, moving to dead-letter lane"
                    );
                    lanes.dead_letter.push_back(job);
                }
            }
        }

        Ok(())
    }

    async fn stats(&self) -> Result<QueueStats> {
        let lanes = self.lanes.lock().await;
        Ok(QueueStats {
            pending: lanes.pending.len() as u64 + lanes.delayed_count(),
            in_flight: lanes.in_flight.len() as u64,
            dead_letter: lanes.dead_letter.len() as u64,
        })
    }

    async fn drain(&self, lane: Lane) -> Result<u64> {
        let mut lanes = self.lanes.lock().await;
        let removed = match lane {
            Lane::Pending => {
                let count = lanes.pending.len() as u64 + lanes.delayed_count();
                lanes.pending.clear();
                lanes.delayed.clear();
                count
            }
            Lane::InFlight => {
                let count = lanes.in_flight.len() as u64;
                lanes.in_flight.clear();
                count
            }
            Lane::DeadLetter => {
                let count = lanes.dead_letter.len() as u64;
                lanes.dead_letter.clear();
                count
            }
        };
        Ok(removed)
    }

    async fn requeue_dead_letter(&self) -> Result<u64> {
        let mut lanes = self.lanes.lock().await;
        let mut moved = 0u64;

        while let Some(mut job) = lanes.dead_letter.pop_front() {
            job.reset_attempts();
            lanes.pending.push_back(job);
            moved += 1;
        }

        if moved > 0 {
            tracing::info!(count = moved, "Requeued dead-letter jobs");
        }

        Ok(moved)
    }

    fn is_healthy(&self) -> bool {
        self.health_status.load(Ordering::Acquire)
    }
}
