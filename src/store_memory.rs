//! In-memory product store implementation
//!
//! Backs the [`ProductStore`] trait with plain maps behind a single mutex,
//! so every trait call is all-or-nothing the same way a database transaction
//! would be. Suitable for development and tests; production deployments plug
//! in the marketplace's relational store.

use crate::error::Result;
use crate::traits::catalog::ProductRecord;
use crate::traits::store::{ProductMapping, ProductStore, SyncLogEntry, SyncStatus};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    /// Internal products keyed by internal id
    products: HashMap<String, ProductRecord>,
    /// Mappings keyed by external product id
    mappings: HashMap<String, ProductMapping>,
    /// Append-only audit log
    logs: Vec<SyncLogEntry>,
}

/// In-memory product store
#[derive(Clone, Default)]
pub struct InMemoryProductStore {
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryProductStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Internal product by id, for test assertions
    pub async fn product(&self, internal_id: &str) -> Option<ProductRecord> {
        self.inner.lock().await.products.get(internal_id).cloned()
    }

    /// Number of stored internal products
    pub async fn product_count(&self) -> usize {
        self.inner.lock().await.products.len()
    }

    /// Number of mapping rows
    pub async fn mapping_count(&self) -> usize {
        self.inner.lock().await.mappings.len()
    }

    /// Snapshot of the audit log, for test assertions
    pub async fn log_entries(&self) -> Vec<SyncLogEntry> {
        self.inner.lock().await.logs.clone()
    }
}

#[async_trait]
impl ProductStore for InMemoryProductStore {
    async fn find_mapping(&self, external_id: &str) -> Result<Option<ProductMapping>> {
        let inner = self.inner.lock().await;
        Ok(inner.mappings.get(external_id).cloned())
    }

    async fn upsert_synced(&self, record: &ProductRecord, mut log: SyncLogEntry) -> Result<String> {
        let mut inner = self.inner.lock().await;

        let internal_id = match inner.mappings.get(&record.external_id) {
            Some(mapping) => mapping.internal_product_id.clone(),
            None => Uuid::new_v4().to_string(),
        };

        inner
            .products
            .insert(internal_id.clone(), record.clone());
        inner.mappings.insert(
            record.external_id.clone(),
            ProductMapping {
                external_product_id: record.external_id.clone(),
                internal_product_id: internal_id.clone(),
                last_synced_at: log.created_at,
                sync_status: SyncStatus::Success,
            },
        );
        log.product_id = Some(internal_id.clone());
        inner.logs.push(log);

        Ok(internal_id)
    }

    async fn delete_synced(&self, external_id: &str, mut log: SyncLogEntry) -> Result<Option<String>> {
        let mut inner = self.inner.lock().await;

        let Some(mapping) = inner.mappings.remove(external_id) else {
            // Already deleted; no mutation, caller records the partial outcome
            return Ok(None);
        };

        inner.products.remove(&mapping.internal_product_id);
        log.product_id = Some(mapping.internal_product_id.clone());
        inner.logs.push(log);

        Ok(Some(mapping.internal_product_id))
    }

    async fn append_log(&self, entry: SyncLogEntry) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.logs.push(entry);
        Ok(())
    }
}
