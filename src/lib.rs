//! pimsync - PIM synchronization queue and worker
//!
//! An asynchronous job pipeline that pulls product change events from an
//! external catalog (PIM) system and applies them to a marketplace's product
//! store with retry, backoff, and audit guarantees.
//!
//! # Architecture
//!
//! - **Queue** ([`SyncQueue`]): durable FIFO job store with pending,
//!   in-flight, and dead-letter lanes. In-memory and Redis backends.
//! - **Worker** ([`SyncWorker`]): polling loop that processes one job at a
//!   time and owns graceful shutdown.
//! - **Processor** ([`SyncProcessor`]): fetches, transforms, and
//!   transactionally persists a product plus its external-id mapping and an
//!   audit-log entry.
//! - **Retry policy** ([`RetryPolicy`]): exponential backoff with a
//!   dead-letter path after the retry budget is exhausted.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use pimsync::{
//!     InMemoryProductStore, InMemorySyncQueue, SyncConfig, SyncProcessor, SyncWorker,
//! };
//! use pimsync::testing::{FieldTransformer, StaticCatalog};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> pimsync::Result<()> {
//!     pimsync::init_tracing();
//!
//!     let config = SyncConfig::from_env()?;
//!     let queue = Arc::new(InMemorySyncQueue::new(config.retry_policy()));
//!     let processor = Arc::new(SyncProcessor::new(
//!         Arc::new(StaticCatalog::new()),
//!         Arc::new(FieldTransformer::new()),
//!         Arc::new(InMemoryProductStore::new()),
//!         "pim",
//!     ));
//!
//!     let (worker, shutdown_rx) = SyncWorker::new(queue, processor, &config, "worker-0");
//!     tokio::spawn(pimsync::worker::shutdown_on_ctrl_c(worker.shutdown_handle()));
//!     let exit = worker.run(shutdown_rx).await;
//!     tracing::info!(jobs_processed = exit.jobs_processed, "Worker exited");
//!     Ok(())
//! }
//! ```

mod config;
mod error;
pub mod processor;
pub mod queue;
pub mod retry;
mod store_memory;
pub mod testing;
pub mod traits;
pub mod utils;
pub mod worker;

// Re-exports for public API
pub use config::{QueueBackend, SyncConfig};
pub use error::{PimSyncError, Result};
pub use processor::{SyncOutcome, SyncProcessor};
pub use queue::InMemorySyncQueue;
#[cfg(feature = "queue-redis")]
pub use queue::RedisSyncQueue;
pub use retry::{RetryDecision, RetryPolicy};
pub use store_memory::InMemoryProductStore;
pub use traits::catalog::{CatalogClient, ProductRecord, ProductTransformer, RawProduct};
pub use traits::queue::{Lane, QueueStats, SyncJob, SyncOperation, SyncQueue};
pub use traits::store::{ProductMapping, ProductStore, SyncLogEntry, SyncStatus};
pub use worker::{ExitReason, SyncWorker, WorkerExit, WorkerState};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing/logging with sensible defaults
///
/// This should be called early in your application, typically in main()
/// before starting the worker.
///
/// # Environment Variables
///
/// - `RUST_LOG`: Set log level (e.g., "info", "debug", "pimsync=debug")
/// - `PIMSYNC_LOG_JSON`: Set to "true" for JSON formatted logs
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json_logs = std::env::var("PIMSYNC_LOG_JSON")
        .map(|v| v.parse::<bool>().unwrap_or(false))
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
