//! Sync queue trait and job wire format
//!
//! A durable FIFO job store with three lanes: pending, in-flight, and
//! dead-letter. A job is owned by exactly one lane at any instant and moves
//! between lanes only through single atomic operations, so a crash can never
//! leave a job observable in neither lane.

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Kind of change being synchronized from the upstream catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncOperation {
    Create,
    Update,
    Delete,
}

impl std::fmt::Display for SyncOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Create => write!(f, "CREATE"),
            Self::Update => write!(f, "UPDATE"),
            Self::Delete => write!(f, "DELETE"),
        }
    }
}

/// A single unit of sync work, serialized as JSON for queue storage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncJob {
    /// Unique job identifier, assigned at enqueue time
    pub id: String,
    /// Operation to perform against the product store
    pub operation: SyncOperation,
    /// Upstream catalog identifier being synchronized
    pub external_product_id: String,
    /// Number of failed processing attempts so far
    pub attempts: u32,
    /// Timestamp when the job was enqueued
    pub created_at: DateTime<Utc>,
    /// Last failure message, present after at least one failed attempt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Opaque key/value bag for tracing (e.g. originating webhook event id)
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

impl SyncJob {
    /// Create a fresh job with zero attempts
    pub fn new(
        id: String,
        operation: SyncOperation,
        external_product_id: String,
        metadata: HashMap<String, String>,
    ) -> Self {
        Self {
            id,
            operation,
            external_product_id,
            attempts: 0,
            created_at: Utc::now(),
            error: None,
            metadata,
        }
    }

    /// Record a failed attempt, returning the new attempt count
    pub fn record_failure(&mut self, error: impl Into<String>) -> u32 {
        self.attempts += 1;
        self.error = Some(error.into());
        self.attempts
    }

    /// Reset retry bookkeeping, used when requeueing from the dead-letter lane
    pub fn reset_attempts(&mut self) {
        self.attempts = 0;
        self.error = None;
    }
}

/// Point-in-time lane counts for observability
///
/// Jobs waiting out a retry backoff count as pending: they are owed a run and
/// have not been abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub pending: u64,
    pub in_flight: u64,
    pub dead_letter: u64,
}

impl QueueStats {
    /// Total jobs currently owned by any lane
    pub fn total(&self) -> u64 {
        self.pending + self.in_flight + self.dead_letter
    }
}

/// Logical partition of the queue, addressable for maintenance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lane {
    Pending,
    InFlight,
    DeadLetter,
}

/// Durable job queue for product sync work
///
/// Implementations provide different backends (in-memory, Redis) but share
/// the same interface. All lane transitions must be atomic single operations
/// so the queue stays safe under multiple concurrent workers.
#[async_trait]
pub trait SyncQueue: Send + Sync {
    /// Create a job and append it to the tail of the pending lane
    ///
    /// Returns the new job id. Transient store errors surface to the caller,
    /// which must retry the enqueue itself.
    async fn enqueue(
        &self,
        operation: SyncOperation,
        external_product_id: &str,
        metadata: HashMap<String, String>,
    ) -> Result<String>;

    /// Atomically move the head of the pending lane to in-flight
    ///
    /// Returns `None` when the pending lane is empty; this is the normal idle
    /// signal, not a failure. Jobs whose retry backoff has elapsed become
    /// visible to this call.
    async fn dequeue(&self) -> Result<Option<SyncJob>>;

    /// Remove a finished job from the in-flight lane
    ///
    /// Idempotent: completing an unknown or already-completed job id is a
    /// no-op, so duplicate completion signals after a crash-and-resume are safe.
    async fn complete(&self, job_id: &str) -> Result<()>;

    /// Record a failed attempt and either schedule a retry or dead-letter
    ///
    /// Increments the job's attempt count, records the error, and consults
    /// the retry policy: below the retry budget the job becomes pending again
    /// after the backoff delay, otherwise it moves to the dead-letter lane.
    async fn fail(&self, job_id: &str, error: &str) -> Result<()>;

    /// Point-in-time lane counts
    async fn stats(&self) -> Result<QueueStats>;

    /// Bulk-clear a lane, returning the number of jobs removed
    async fn drain(&self, lane: Lane) -> Result<u64>;

    /// Move every dead-letter job back to pending with attempts reset to 0
    /// and error cleared, returning the number of jobs moved
    async fn requeue_dead_letter(&self) -> Result<u64>;

    /// Cached health status of the queue backend
    fn is_healthy(&self) -> bool;
}
