//! Redis-backed sync queue implementation
//!
//! Uses Redis lists and a sorted set for distributed job processing.
//! Multiple worker instances can compete for jobs from the same queue.
//!
//! Redis data structures:
//! - `pim:sync:pending` - List of jobs ready to be processed
//! - `pim:sync:inflight` - List of jobs currently being processed
//! - `pim:sync:dead` - List of jobs that exhausted their retry budget
//! - `pim:sync:delayed` - Sorted set of retry-delayed jobs (score = due timestamp)
//!
//! Every lane transition is a single `LMOVE`, a `MULTI`/`EXEC` pipeline, or a
//! Lua script, so a crash between operations can never leave a job outside
//! all lanes or duplicated across two. Retry delays live in the sorted set
//! rather than an in-process timer, which means pending retries survive a
//! worker restart.

use crate::error::{PimSyncError, Result};
use crate::retry::{RetryDecision, RetryPolicy};
use crate::traits::queue::{Lane, QueueStats, SyncJob, SyncOperation, SyncQueue};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

const PENDING_KEY: &str = "pim:sync:pending";
const INFLIGHT_KEY: &str = "pim:sync:inflight";
const DEAD_KEY: &str = "pim:sync:dead";
const DELAYED_KEY: &str = "pim:sync:delayed";

// Conditional lane moves run as Lua so the push only happens when this
// caller's removal won; a lost race is a clean no-op instead of a duplicate
// copy in pending.

/// KEYS: delayed zset, pending list; ARGV: serialized job
const PROMOTE_SCRIPT: &str = r#"
if redis.call('ZREM', KEYS[1], ARGV[1]) == 1 then
    redis.call('LPUSH', KEYS[2], ARGV[1])
    return 1
end
return 0
"#;

/// KEYS: dead-letter list, pending list; ARGV: dead-letter entry, reset copy
const REQUEUE_SCRIPT: &str = r#"
if redis.call('LREM', KEYS[1], 1, ARGV[1]) == 1 then
    redis.call('LPUSH', KEYS[2], ARGV[2])
    return 1
end
return 0
"#;

/// Redis-backed sync queue
#[derive(Clone)]
pub struct RedisSyncQueue {
    client: redis::Client,
    retry_policy: RetryPolicy,
    /// Cached health status (updated by ping operations)
    health_status: Arc<AtomicBool>,
}

impl RedisSyncQueue {
    /// Create a new Redis sync queue
    ///
    /// # Arguments
    ///
    /// * `url` - Redis connection URL (e.g., "redis://127.0.0.1:6379")
    /// * `retry_policy` - Backoff and dead-letter policy for failed jobs
    pub fn new(url: &str, retry_policy: RetryPolicy) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| PimSyncError::queue(format!("Failed to create Redis client: {}", e)))?;

        Ok(Self {
            client,
            retry_policy,
            health_status: Arc::new(AtomicBool::new(true)),
        })
    }

    /// Ping Redis and update the cached health status
    ///
    /// Call this periodically (e.g., every 30 seconds) to keep the status
    /// returned by the synchronous `is_healthy()` accurate.
    pub async fn ping(&self) -> bool {
        match self.get_connection().await {
            Ok(mut conn) => {
                let result: redis::RedisResult<String> =
                    redis::cmd("PING").query_async(&mut conn).await;
                let healthy = result.is_ok();
                self.health_status.store(healthy, Ordering::Release);
                healthy
            }
            Err(e) => {
                tracing::warn!("Redis sync queue ping failed: {}", e);
                self.health_status.store(false, Ordering::Release);
                false
            }
        }
    }

    async fn get_connection(&self) -> Result<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| PimSyncError::queue(format!("Failed to get Redis connection: {}", e)))
    }

    /// Move every retry-delayed job whose due time has passed into pending
    ///
    /// Each removal+push pair runs as one Lua script, so concurrent workers
    /// promoting the same due job produce exactly one pending copy.
    async fn promote_due(&self, conn: &mut redis::aio::MultiplexedConnection) -> Result<()> {
        let now = Utc::now().timestamp();

        let due: Vec<String> = redis::cmd("ZRANGEBYSCORE")
            .arg(DELAYED_KEY)
            .arg("-inf")
            .arg(now)
            .query_async(conn)
            .await
            .map_err(|e| PimSyncError::queue(format!("Failed to read delayed jobs: {}", e)))?;

        for job_json in due {
            // Returns 0 when another worker already promoted this entry
            let _: i64 = redis::Script::new(PROMOTE_SCRIPT)
                .key(DELAYED_KEY)
                .key(PENDING_KEY)
                .arg(&job_json)
                .invoke_async(conn)
                .await
                .map_err(|e| PimSyncError::queue(format!("Failed to promote delayed job: {}", e)))?;
        }

        Ok(())
    }

    /// Find the serialized form of a job in the in-flight lane by id
    async fn find_in_flight(
        &self,
        conn: &mut redis::aio::MultiplexedConnection,
        job_id: &str,
    ) -> Result<Option<(String, SyncJob)>> {
        let jobs: Vec<String> = redis::cmd("LRANGE")
            .arg(INFLIGHT_KEY)
            .arg(0)
            .arg(-1)
            .query_async(conn)
            .await
            .map_err(|e| PimSyncError::queue(format!("Failed to list in-flight jobs: {}", e)))?;

        for job_json in jobs {
            if let Ok(job) = serde_json::from_str::<SyncJob>(&job_json) {
                if job.id == job_id {
                    return Ok(Some((job_json, job)));
                }
            }
        }

        Ok(None)
    }
}

#[async_trait]
impl SyncQueue for RedisSyncQueue {
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

        let job_json = serde_json::to_string(&job)
            .map_err(|e| PimSyncError::queue(format!("Failed to serialize job: {}", e)))?;

        let mut conn = self.get_connection().await?;
        redis::cmd("LPUSH")
            .arg(PENDING_KEY)
            .arg(&job_json)
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| PimSyncError::queue(format!("Failed to enqueue job: {}", e)))?;

        Ok(job_id)
    }

    async fn dequeue(&self) -> Result<Option<SyncJob>> {
        let mut conn = self.get_connection().await?;

        self.promote_due(&mut conn).await?;

        // LMOVE is a single atomic pop-from-pending push-to-inflight, so no
        // two workers can receive the same job and a crash mid-call cannot
        // lose one.
        let result: Option<String> = redis::cmd("LMOVE")
            .arg(PENDING_KEY)
            .arg(INFLIGHT_KEY)
            .arg("RIGHT")
            .arg("LEFT")
            .query_async(&mut conn)
            .await
            .map_err(|e| PimSyncError::queue(format!("Failed to dequeue job: {}", e)))?;

        match result {
            Some(job_json) => {
                let job: SyncJob = serde_json::from_str(&job_json)
                    .map_err(|e| PimSyncError::queue(format!("Failed to deserialize job: {}", e)))?;
                Ok(Some(job))
            }
            None => Ok(None),
        }
    }

    async fn complete(&self, job_id: &str) -> Result<()> {
        let mut conn = self.get_connection().await?;

        // Unknown ids fall through silently: completion is idempotent
        if let Some((job_json, _)) = self.find_in_flight(&mut conn, job_id).await? {
            redis::cmd("LREM")
                .arg(INFLIGHT_KEY)
                .arg(1)
                .arg(&job_json)
                .query_async::<()>(&mut conn)
                .await
                .map_err(|e| {
                    PimSyncError::queue(format!("Failed to remove job from in-flight: {}", e))
                })?;
        }

        Ok(())
    }

    async fn fail(&self, job_id: &str, error: &str) -> Result<()> {
        let mut conn = self.get_connection().await?;

        let Some((job_json, mut job)) = self.find_in_flight(&mut conn, job_id).await? else {
            return Ok(());
        };

        let attempts = job.record_failure(error);
        let updated_json = serde_json::to_string(&job)
            .map_err(|e| PimSyncError::queue(format!("Failed to serialize job: {}", e)))?;

        match self.retry_policy.decide(attempts) {
            RetryDecision::Retry { delay } => {
                let due = Utc::now().timestamp() + delay.as_secs() as i64;
                redis::pipe()
                    .atomic()
                    .cmd("LREM")
                    .arg(INFLIGHT_KEY)
                    .arg(1)
                    .arg(&job_json)
                    .cmd("ZADD")
                    .arg(DELAYED_KEY)
                    .arg(due)
                    .arg(&updated_json)
                    .query_async::<()>(&mut conn)
                    .await
                    .map_err(|e| PimSyncError::queue(format!("Failed to schedule retry: {}", e)))?;
            }
            RetryDecision::DeadLetter => {
                tracing::warn!(
                    job_id = %job.id,
                    attempts = job.attempts,
                    error = %error,
                    "Job exhausted retries, moving to dead-letter lane"
                );
                redis::pipe()
                    .atomic()
                    .cmd("LREM")
                    .arg(INFLIGHT_KEY)
                    .arg(1)
                    .arg(&job_json)
                    .cmd("LPUSH")
                    .arg(DEAD_KEY)
                    .arg(&updated_json)
                    .query_async::<()>(&mut conn)
                    .await
                    .map_err(|e| PimSyncError::queue(format!("Failed to dead-letter job: {}", e)))?;
            }
        }

        Ok(())
    }

    async fn stats(&self) -> Result<QueueStats> {
        let mut conn = self.get_connection().await?;

        let (pending, delayed, in_flight, dead_letter): (u64, u64, u64, u64) = redis::pipe()
            .cmd("LLEN")
            .arg(PENDING_KEY)
            .cmd("ZCARD")
            .arg(DELAYED_KEY)
            .cmd("LLEN")
            .arg(INFLIGHT_KEY)
            .cmd("LLEN")
            .arg(DEAD_KEY)
            .query_async(&mut conn)
            .await
            .map_err(|e| PimSyncError::queue(format!("Failed to read queue stats: {}", e)))?;

        Ok(QueueStats {
            pending: pending + delayed,
            in_flight,
            dead_letter,
        })
    }

    async fn drain(&self, lane: Lane) -> Result<u64> {
        let mut conn = self.get_connection().await?;

        let removed = match lane {
            Lane::Pending => {
                let (pending, delayed, _, _): (u64, u64, u64, u64) = redis::pipe()
                    .atomic()
                    .cmd("LLEN")
                    .arg(PENDING_KEY)
                    .cmd("ZCARD")
                    .arg(DELAYED_KEY)
                    .cmd("DEL")
                    .arg(PENDING_KEY)
                    .cmd("DEL")
                    .arg(DELAYED_KEY)
                    .query_async(&mut conn)
                    .await
                    .map_err(|e| PimSyncError::queue(format!("Failed to drain pending: {}", e)))?;
                pending + delayed
            }
            Lane::InFlight => {
                let (count, _): (u64, u64) = redis::pipe()
                    .atomic()
                    .cmd("LLEN")
                    .arg(INFLIGHT_KEY)
                    .cmd("DEL")
                    .arg(INFLIGHT_KEY)
                    .query_async(&mut conn)
                    .await
                    .map_err(|e| PimSyncError::queue(format!("Failed to drain in-flight: {}", e)))?;
                count
            }
            Lane::DeadLetter => {
                let (count, _): (u64, u64) = redis::pipe()
                    .atomic()
                    .cmd("LLEN")
                    .arg(DEAD_KEY)
                    .cmd("DEL")
                    .arg(DEAD_KEY)
                    .query_async(&mut conn)
                    .await
                    .map_err(|e| {
                        PimSyncError::queue(format!("Failed to drain dead-letter: {}", e))
                    })?;
                count
            }
        };

        Ok(removed)
    }

    async fn requeue_dead_letter(&self) -> Result<u64> {
        let mut conn = self.get_connection().await?;

        let jobs: Vec<String> = redis::cmd("LRANGE")
            .arg(DEAD_KEY)
            .arg(0)
            .arg(-1)
            .query_async(&mut conn)
            .await
            .map_err(|e| PimSyncError::queue(format!("Failed to list dead-letter jobs: {}", e)))?;

        let mut moved = 0u64;
        for job_json in jobs {
            let Ok(mut job) = serde_json::from_str::<SyncJob>(&job_json) else {
                tracing::warn!("Skipping undecodable dead-letter entry during requeue");
                continue;
            };
            job.reset_attempts();
            let reset_json = serde_json::to_string(&job)
                .map_err(|e| PimSyncError::queue(format!("Failed to serialize job: {}", e)))?;

            // Another maintenance caller may have requeued it already; the
            // script only pushes the reset copy when the dead-letter entry was
            // still ours to remove
            let requeued: i64 = redis::Script::new(REQUEUE_SCRIPT)
                .key(DEAD_KEY)
                .key(PENDING_KEY)
                .arg(&job_json)
                .arg(&reset_json)
                .invoke_async(&mut conn)
                .await
                .map_err(|e| PimSyncError::queue(format!("Failed to requeue job: {}", e)))?;

            if requeued == 1 {
                moved += 1;
            }
        }

        if moved > 0 {
            tracing::info!(count = moved, "Requeued dead-letter jobs");
        }

        Ok(moved)
    }

    fn is_healthy(&self) -> bool {
        // Cached status from the last ping() call
        self.health_status.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Note: These tests require a running Redis instance

    async fn fresh_queue(retry_policy: RetryPolicy) -> RedisSyncQueue {
        let queue = RedisSyncQueue::new("redis://127.0.0.1/", retry_policy).unwrap();
        queue.drain(Lane::Pending).await.unwrap();
        queue.drain(Lane::InFlight).await.unwrap();
        queue.drain(Lane::DeadLetter).await.unwrap();
        queue
    }

    #[tokio::test]
    #[ignore] // Requires Redis
    async fn test_concurrent_promotion_yields_single_copy() {
        // Backoff base 0 makes a failed job due for promotion immediately
        let queue = fresh_queue(RetryPolicy::new(3, 0)).await;

        queue
            .enqueue(SyncOperation::Update, "sku-race", HashMap::new())
            .await
            .unwrap();
        let job = queue.dequeue().await.unwrap().unwrap();
        queue.fail(&job.id, "transient").await.unwrap();

        // Both dequeuers race to promote the same delayed entry; exactly one
        // may receive the job
        let (a, b) = tokio::join!(queue.dequeue(), queue.dequeue());
        let delivered = [a.unwrap(), b.unwrap()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].id, job.id);

        let stats = queue.stats().await.unwrap();
        assert_eq!(stats.pending, 0);
        assert_eq!(stats.in_flight, 1);
    }

    #[tokio::test]
    #[ignore] // Requires Redis
    async fn test_concurrent_requeue_yields_single_copy() {
        // Zero retry budget dead-letters on the first failure
        let queue = fresh_queue(RetryPolicy::new(0, 2)).await;

        queue
            .enqueue(SyncOperation::Create, "sku-dead", HashMap::new())
            .await
            .unwrap();
        let job = queue.dequeue().await.unwrap().unwrap();
        queue.fail(&job.id, "fatal").await.unwrap();

        let (a, b) = tokio::join!(queue.requeue_dead_letter(), queue.requeue_dead_letter());
        assert_eq!(a.unwrap() + b.unwrap(), 1);

        let stats = queue.stats().await.unwrap();
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.dead_letter, 0);
    }
}
