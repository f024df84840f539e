//! Sync processor: operation-specific handlers for product sync jobs
//!
//! Create/Update jobs fetch the raw product from the upstream catalog,
//! transform it to the internal representation, and persist product, mapping,
//! and audit entry in one transactional store call. Delete jobs remove the
//! product and its mapping, treating an absent mapping as an idempotent no-op
//! recorded as a partial outcome.
//!
//! Failures never escape [`SyncProcessor::process`]: every error is folded
//! into a [`SyncOutcome`] so the worker loop can route it to the queue's fail
//! path without its own error handling.

use crate::error::Result;
use crate::traits::catalog::{CatalogClient, ProductTransformer};
use crate::traits::queue::{SyncJob, SyncOperation};
use crate::traits::store::{ProductStore, SyncLogEntry, SyncStatus};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;

/// Uniform result of processing one job
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    pub success: bool,
    pub internal_product_id: Option<String>,
    pub duration_ms: u64,
    pub error: Option<String>,
}

impl SyncOutcome {
    fn success(internal_product_id: Option<String>, duration_ms: u64) -> Self {
        Self {
            success: true,
            internal_product_id,
            duration_ms,
            error: None,
        }
    }

    fn failure(error: String, duration_ms: u64) -> Self {
        Self {
            success: false,
            internal_product_id: None,
            duration_ms,
            error: Some(error),
        }
    }
}

/// Dispatches sync jobs to their operation-specific handlers
pub struct SyncProcessor {
    catalog: Arc<dyn CatalogClient>,
    transformer: Arc<dyn ProductTransformer>,
    store: Arc<dyn ProductStore>,
    /// Source label recorded on every audit entry
    source: String,
}

impl SyncProcessor {
    pub fn new(
        catalog: Arc<dyn CatalogClient>,
        transformer: Arc<dyn ProductTransformer>,
        store: Arc<dyn ProductStore>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            catalog,
            transformer,
            store,
            source: source.into(),
        }
    }

    /// Process one job, converting every failure into a structured outcome
    pub async fn process(&self, job: &SyncJob) -> SyncOutcome {
        let started = Instant::now();

        let result = match job.operation {
            SyncOperation::Create | SyncOperation::Update => {
                self.sync_from_upstream(job, started).await
            }
            SyncOperation::Delete => self.delete_from_store(job, started).await,
        };

        let duration_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(StepOutcome {
                internal_product_id,
                status,
            }) => {
                tracing::debug!(
                    job_id = %job.id,
                    external_product_id = %job.external_product_id,
                    operation = %job.operation,
                    status = %status,
                    duration_ms,
                    "Sync job processed"
                );
                SyncOutcome::success(internal_product_id, duration_ms)
            }
            Err(e) => {
                let error = e.to_string();
                self.log_failure(job, &error, duration_ms).await;
                SyncOutcome::failure(error, duration_ms)
            }
        }
    }

    /// CREATE/UPDATE: fetch, transform, then one transactional upsert of
    /// product + mapping + audit entry
    async fn sync_from_upstream(&self, job: &SyncJob, started: Instant) -> Result<StepOutcome> {
        let raw = self
            .catalog
            .fetch_product(&job.external_product_id)
            .await?;
        let record = self.transformer.transform(&raw)?;

        // The store resolves the internal product id inside the transaction
        // and stamps it on the entry. The audited duration stops here; the
        // outcome's duration also covers the write itself.
        let mut log = self.log_entry(job, SyncStatus::Success, None);
        log.duration_ms = started.elapsed().as_millis() as u64;
        let internal_id = self.store.upsert_synced(&record, log).await?;

        Ok(StepOutcome {
            internal_product_id: Some(internal_id),
            status: SyncStatus::Success,
        })
    }

    /// DELETE: transactional removal of product + mapping; an absent mapping
    /// is an idempotent no-op recorded as PARTIAL
    async fn delete_from_store(&self, job: &SyncJob, started: Instant) -> Result<StepOutcome> {
        let mut log = self.log_entry(job, SyncStatus::Success, None);
        log.duration_ms = started.elapsed().as_millis() as u64;

        match self.store.delete_synced(&job.external_product_id, log).await? {
            Some(internal_id) => Ok(StepOutcome {
                internal_product_id: Some(internal_id),
                status: SyncStatus::Success,
            }),
            None => {
                // Already gone upstream of us; audit the partial outcome
                // outside any transaction since nothing was mutated
                let mut partial = self.log_entry(job, SyncStatus::Partial, None);
                partial.duration_ms = started.elapsed().as_millis() as u64;
                if let Err(e) = self.store.append_log(partial).await {
                    tracing::warn!(
                        job_id = %job.id,
                        error = %e,
                        "Failed to write partial-outcome audit entry"
                    );
                }
                Ok(StepOutcome {
                    internal_product_id: None,
                    status: SyncStatus::Partial,
                })
            }
        }
    }

    /// Best-effort failure audit entry; never masks the original error
    async fn log_failure(&self, job: &SyncJob, error: &str, duration_ms: u64) {
        let mut entry = self.log_entry(job, SyncStatus::Failed, Some(error.to_string()));
        entry.duration_ms = duration_ms;

        if let Err(e) = self.store.append_log(entry).await {
            tracing::warn!(
                job_id = %job.id,
                error = %e,
                "Failed to write failure audit entry"
            );
        }
    }

    fn log_entry(&self, job: &SyncJob, status: SyncStatus, error: Option<String>) -> SyncLogEntry {
        SyncLogEntry {
            source: self.source.clone(),
            operation: job.operation,
            product_id: None,
            status,
            metadata: job.metadata.clone(),
            error,
            duration_ms: 0,
            created_at: Utc::now(),
        }
    }
}

struct StepOutcome {
    internal_product_id: Option<String>,
    status: SyncStatus,
}
