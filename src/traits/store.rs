//! Product store trait: transactional product, mapping, and audit-log writes
//!
//! The relational store is an external collaborator; this seam exposes it as
//! a handful of transactional operations. Each mutating call is all-or-nothing:
//! the product write, the mapping upsert/delete, and the audit log entry it
//! carries either all land or none do.

use crate::error::Result;
use crate::traits::catalog::ProductRecord;
use crate::traits::queue::SyncOperation;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Outcome recorded against a mapping or audit entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncStatus {
    Success,
    Failed,
    Partial,
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "SUCCESS"),
            Self::Failed => write!(f, "FAILED"),
            Self::Partial => write!(f, "PARTIAL"),
        }
    }
}

/// Bidirectional link between external and internal product identity
///
/// Created on first successful CREATE/UPDATE, refreshed on every later
/// successful sync, and removed entirely when the product is deleted, so
/// mapping lookups only ever reflect currently-synced products. Audit history
/// lives in the log, not here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductMapping {
    pub external_product_id: String,
    pub internal_product_id: String,
    pub last_synced_at: DateTime<Utc>,
    pub sync_status: SyncStatus,
}

/// Append-only audit record, write-once
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncLogEntry {
    /// Originating sync source (e.g. the upstream system name)
    pub source: String,
    pub operation: SyncOperation,
    /// Internal product id, absent when the product could not be resolved
    pub product_id: Option<String>,
    pub status: SyncStatus,
    pub metadata: HashMap<String, String>,
    pub error: Option<String>,
    /// Processing time up to the point the entry was handed to the store;
    /// the transactional write itself is not counted. The full wall-clock
    /// duration of a job lives on the processor's outcome, not here.
    pub duration_ms: u64,
    pub created_at: DateTime<Utc>,
}

/// Transactional product store consumed by the sync processor
///
/// Implementations back this with the marketplace's relational database; an
/// in-memory implementation ships for development and tests.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Look up the mapping for an upstream identifier
    async fn find_mapping(&self, external_id: &str) -> Result<Option<ProductMapping>>;

    /// Upsert a product plus its mapping and a success audit entry, in one
    /// transaction
    ///
    /// If a mapping exists, the existing internal product is updated in place;
    /// otherwise a new internal product is created. The mapping's
    /// `last_synced_at` is refreshed, and the implementation stamps the
    /// resolved internal id onto the log entry's `product_id`. Returns the
    /// internal product id.
    async fn upsert_synced(&self, record: &ProductRecord, log: SyncLogEntry) -> Result<String>;

    /// Delete a product, its mapping, and write the audit entry, in one
    /// transaction
    ///
    /// Returns the deleted internal product id, or `None` when no mapping
    /// exists; in that case nothing is mutated and the caller records the
    /// partial outcome through [`ProductStore::append_log`].
    async fn delete_synced(&self, external_id: &str, log: SyncLogEntry) -> Result<Option<String>>;

    /// Append an audit entry outside any product transaction
    ///
    /// Used for failure and partial-outcome records; best-effort from the
    /// caller's point of view.
    async fn append_log(&self, entry: SyncLogEntry) -> Result<()>;
}
