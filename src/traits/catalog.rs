//! Upstream catalog client and transformer seams
//!
//! The external PIM system is consumed through a single fetch call, and the
//! conversion from its raw payload to the marketplace's internal product
//! representation goes through a transformer trait. Both are collaborators
//! owned by the embedding application; this crate only defines the seams and
//! ships test doubles in [`crate::testing`].

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A product as returned by the upstream catalog, payload left opaque
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawProduct {
    pub external_id: String,
    pub payload: serde_json::Value,
    pub fetched_at: DateTime<Utc>,
}

impl RawProduct {
    pub fn new(external_id: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            external_id: external_id.into(),
            payload,
            fetched_at: Utc::now(),
        }
    }
}

/// Internal product representation written to the product store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub external_id: String,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub currency: String,
    pub stock: i64,
    /// Remaining catalog attributes, carried through untyped
    pub attributes: serde_json::Value,
}

/// Client for the external PIM system
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Fetch the current raw product for an upstream identifier
    ///
    /// A fetch failure is a processing failure and flows into the queue's
    /// retry path.
    async fn fetch_product(&self, external_id: &str) -> Result<RawProduct>;
}

/// Converts a raw upstream product into the internal representation
pub trait ProductTransformer: Send + Sync {
    fn transform(&self, raw: &RawProduct) -> Result<ProductRecord>;
}
