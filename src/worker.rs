//! Sync worker: single-job-at-a-time polling loop with graceful shutdown
//!
//! Each worker instance processes at most one job at a time; horizontal
//! scale-out means running more worker instances against the same queue.
//! Shutdown is cooperative: a signal moves the worker from `Running` to
//! `Draining`, an in-flight job always finishes, and the loop returns a
//! structured [`WorkerExit`] instead of terminating the process itself.

use crate::config::SyncConfig;
use crate::error::Result;
use crate::processor::SyncProcessor;
use crate::traits::queue::SyncQueue;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{sleep, Duration};

/// Lifecycle of a worker instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Running,
    /// Shutdown requested, finishing the in-flight job
    Draining,
    Stopped,
}

/// Why the worker returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// Worker disabled by configuration; the loop never started
    Disabled,
    /// Graceful shutdown after a termination signal
    ShutdownSignal,
}

/// Structured shutdown result returned to the caller/supervisor
#[derive(Debug, Clone)]
pub struct WorkerExit {
    pub worker_id: String,
    pub jobs_processed: u64,
    pub reason: ExitReason,
}

/// A single worker that processes sync jobs from a queue
pub struct SyncWorker {
    queue: Arc<dyn SyncQueue>,
    processor: Arc<SyncProcessor>,
    worker_id: String,
    enabled: bool,
    poll_interval: Duration,
    error_cooldown: Duration,
    shutdown_tx: mpsc::Sender<()>,
}

impl SyncWorker {
    /// Create a new sync worker from configuration
    ///
    /// Returns the worker and the receiving end of its shutdown channel;
    /// pass the receiver to [`SyncWorker::run`].
    pub fn new(
        queue: Arc<dyn SyncQueue>,
        processor: Arc<SyncProcessor>,
        config: &SyncConfig,
        worker_id: impl Into<String>,
    ) -> (Self, mpsc::Receiver<()>) {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        (
            Self {
                queue,
                processor,
                worker_id: worker_id.into(),
                enabled: config.enabled,
                poll_interval: Duration::from_millis(config.poll_interval_ms),
                error_cooldown: Duration::from_millis(config.error_cooldown_ms),
                shutdown_tx,
            },
            shutdown_rx,
        )
    }

    /// Handle for requesting shutdown from another task
    pub fn shutdown_handle(&self) -> mpsc::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Run the worker until shutdown is requested
    ///
    /// A disabled worker returns immediately without touching the queue.
    /// Queue-level errors (e.g. the store being unreachable) are logged and
    /// followed by a fixed cooldown; they never crash the loop.
    pub async fn run(self, mut shutdown_rx: mpsc::Receiver<()>) -> WorkerExit {
        if !self.enabled {
            tracing::info!(worker_id = %self.worker_id, "Sync worker disabled, exiting");
            return WorkerExit {
                worker_id: self.worker_id,
                jobs_processed: 0,
                reason: ExitReason::Disabled,
            };
        }

        tracing::info!(worker_id = %self.worker_id, "Sync worker started");

        let mut state = WorkerState::Running;
        let mut jobs_processed = 0u64;

        while state == WorkerState::Running {
            // Processing below is never raced against the shutdown channel:
            // an in-flight job must finish before the worker drains, so the
            // signal is only observed between jobs and during idle sleeps
            if shutdown_rx.try_recv().is_ok() {
                tracing::info!(worker_id = %self.worker_id, "Shutdown signal received, draining");
                state = WorkerState::Draining;
                continue;
            }

            match self.process_next_job().await {
                Ok(Some(_)) => {
                    jobs_processed += 1;
                }
                Ok(None) => {
                    // Pending lane empty, idle until the next poll
                    tokio::select! {
                        _ = shutdown_rx.recv() => {
                            tracing::info!(worker_id = %self.worker_id, "Shutdown signal received, draining");
                            state = WorkerState::Draining;
                        }
                        _ = sleep(self.poll_interval) => {},
                    }
                }
                Err(e) => {
                    tracing::error!(
                        worker_id = %self.worker_id,
                        error = %e,
                        "Queue error in worker loop, cooling down"
                    );
                    tokio::select! {
                        _ = shutdown_rx.recv() => state = WorkerState::Draining,
                        _ = sleep(self.error_cooldown) => {},
                    }
                }
            }
        }

        tracing::info!(
            worker_id = %self.worker_id,
            jobs_processed,
            "Sync worker stopped"
        );

        WorkerExit {
            worker_id: self.worker_id,
            jobs_processed,
            reason: ExitReason::ShutdownSignal,
        }
    }

    /// Dequeue and process a single job
    ///
    /// Returns `Ok(None)` when the pending lane is empty. Processing failures
    /// are routed to the queue's fail path and still count as a processed
    /// turn; only queue-level errors propagate as `Err`.
    async fn process_next_job(&self) -> Result<Option<String>> {
        let job = match self.queue.dequeue().await? {
            Some(job) => job,
            None => return Ok(None),
        };

        let job_id = job.id.clone();
        tracing::debug!(
            worker_id = %self.worker_id,
            job_id = %job_id,
            operation = %job.operation,
            external_product_id = %job.external_product_id,
            "Processing sync job"
        );

        let outcome = self.processor.process(&job).await;

        if outcome.success {
            self.queue.complete(&job_id).await?;
            tracing::info!(
                worker_id = %self.worker_id,
                job_id = %job_id,
                duration_ms = outcome.duration_ms,
                "Sync job completed"
            );
        } else {
            let error = outcome.error.as_deref().unwrap_or("unknown error");
            self.queue.fail(&job_id, error).await?;
            tracing::warn!(
                worker_id = %self.worker_id,
                job_id = %job_id,
                error = %error,
                "Sync job failed"
            );
        }

        Ok(Some(job_id))
    }
}

/// Forward Ctrl-C (SIGINT/SIGTERM-style termination) to a worker's shutdown
/// channel
///
/// Spawn this alongside [`SyncWorker::run`]; no other signals are handled.
pub async fn shutdown_on_ctrl_c(shutdown_tx: mpsc::Sender<()>) {
    if tokio::signal::ctrl_c().await.is_ok() {
        let _ = shutdown_tx.send(()).await;
    }
}
