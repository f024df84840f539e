//! Test doubles for the catalog and transformer seams
//!
//! Used by this crate's own tests and available to embedding applications
//! for exercising the pipeline without a live PIM system.

use crate::error::{PimSyncError, Result};
use crate::traits::catalog::{CatalogClient, ProductRecord, ProductTransformer, RawProduct};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Catalog client backed by a fixed set of payloads
#[derive(Default)]
pub struct StaticCatalog {
    products: Arc<RwLock<HashMap<String, serde_json::Value>>>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, external_id: impl Into<String>, payload: serde_json::Value) {
        self.products.write().await.insert(external_id.into(), payload);
    }

    pub async fn remove(&self, external_id: &str) {
        self.products.write().await.remove(external_id);
    }
}

#[async_trait]
impl CatalogClient for StaticCatalog {
    async fn fetch_product(&self, external_id: &str) -> Result<RawProduct> {
        let products = self.products.read().await;
        match products.get(external_id) {
            Some(payload) => Ok(RawProduct::new(external_id, payload.clone())),
            None => Err(PimSyncError::upstream(format!(
                "product {} not found in catalog",
                external_id
            ))),
        }
    }
}

/// Catalog client that fails the first `failures` fetches, then succeeds
///
/// Useful for driving the retry path deterministically.
pub struct FlakyCatalog {
    inner: StaticCatalog,
    failures: u32,
    calls: AtomicU32,
}

impl FlakyCatalog {
    pub fn new(inner: StaticCatalog, failures: u32) -> Self {
        Self {
            inner,
            failures,
            calls: AtomicU32::new(0),
        }
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogClient for FlakyCatalog {
    async fn fetch_product(&self, external_id: &str) -> Result<RawProduct> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            return Err(PimSyncError::upstream("simulated upstream outage"));
        }
        self.inner.fetch_product(external_id).await
    }
}

/// Transformer that maps well-known payload fields onto a [`ProductRecord`]
///
/// Expects at least a `name` field; missing or malformed required fields are
/// transform failures, which is the shape of a permanently-bad upstream
/// payload.
#[derive(Default)]
pub struct FieldTransformer;

impl FieldTransformer {
    pub fn new() -> Self {
        Self
    }
}

impl ProductTransformer for FieldTransformer {
    fn transform(&self, raw: &RawProduct) -> Result<ProductRecord> {
        let payload = &raw.payload;

        let name = payload
            .get("name")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                PimSyncError::transform(format!(
                    "product {} payload has no name field",
                    raw.external_id
                ))
            })?
            .to_string();

        Ok(ProductRecord {
            external_id: raw.external_id.clone(),
            name,
            description: payload
                .get("description")
                .and_then(|v| v.as_str())
                .map(String::from),
            price_cents: payload.get("price_cents").and_then(|v| v.as_i64()).unwrap_or(0),
            currency: payload
                .get("currency")
                .and_then(|v| v.as_str())
                .unwrap_or("USD")
                .to_string(),
            stock: payload.get("stock").and_then(|v| v.as_i64()).unwrap_or(0),
            attributes: payload
                .get("attributes")
                .cloned()
                .unwrap_or(serde_json::Value::Null),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_static_catalog_fetch() {
        let catalog = StaticCatalog::new();
        catalog.insert("sku-1", json!({"name": "Widget"})).await;

        let raw = catalog.fetch_product("sku-1").await.unwrap();
        assert_eq!(raw.external_id, "sku-1");

        let missing = catalog.fetch_product("sku-2").await;
        assert!(missing.is_err());
    }

    #[tokio::test]
    async fn test_flaky_catalog_recovers() {
        let inner = StaticCatalog::new();
        inner.insert("sku-1", json!({"name": "Widget"})).await;
        let flaky = FlakyCatalog::new(inner, 2);

        assert!(flaky.fetch_product("sku-1").await.is_err());
        assert!(flaky.fetch_product("sku-1").await.is_err());
        assert!(flaky.fetch_product("sku-1").await.is_ok());
        assert_eq!(flaky.call_count(), 3);
    }

    #[test]
    fn test_field_transformer_maps_fields() {
        let raw = RawProduct::new(
            "sku-1",
            json!({
                "name": "Widget",
                "description": "A widget",
                "price_cents": 1999,
                "currency": "EUR",
                "stock": 12,
                "attributes": {"color": "blue"}
            }),
        );

        let record = FieldTransformer::new().transform(&raw).unwrap();
        assert_eq!(record.name, "Widget");
        assert_eq!(record.price_cents, 1999);
        assert_eq!(record.currency, "EUR");
        assert_eq!(record.stock, 12);
        assert_eq!(record.attributes["color"], "blue");
    }

    #[test]
    fn test_field_transformer_requires_name() {
        let raw = RawProduct::new("sku-1", json!({"price_cents": 100}));
        let result = FieldTransformer::new().transform(&raw);
        assert!(matches!(result, Err(PimSyncError::Transform(_))));
    }
}
