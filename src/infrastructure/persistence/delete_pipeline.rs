//! Fan-out/fan-in pipeline for batched soft-deletes.
//!
//! ```text
//!                 ┌─ lane 0 ─┐
//!  ids ─ dispatch ┼─ lane 1 ─┼─ aggregate ─ flush every N statements ─ sink
//!    (round-robin)└─ lane k ─┘
//! ```
//!
//! The dispatcher hands ids to lanes round-robin, each lane wraps its id into
//! a [`SoftDelete`] statement, and a single aggregation stage groups the
//! statements into batches. A batch is flushed once it reaches the configured
//! threshold, and whatever remains is flushed when the input drains. Every
//! input id reaches the sink exactly once.
//!
//! A failed flush aborts the run. Batches flushed before the failure stay
//! applied; soft-delete is idempotent so the whole call can be retried.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::debug;

use crate::domain::repositories::RepositoryResult;

/// Counter of rows marked deleted.
pub const URLS_DELETED_TOTAL: &str = "shortener_urls_deleted_total";

/// Default upper bound on concurrent lanes.
pub const DEFAULT_MAX_LANES: usize = 20;
/// Default number of statements per flushed batch.
pub const DEFAULT_FLUSH_THRESHOLD: usize = 3;

/// Throughput knobs of the pipeline. Neither affects correctness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteSettings {
    pub max_lanes: usize,
    pub flush_threshold: usize,
}

impl Default for DeleteSettings {
    fn default() -> Self {
        Self {
            max_lanes: DEFAULT_MAX_LANES,
            flush_threshold: DEFAULT_FLUSH_THRESHOLD,
        }
    }
}

/// A soft-delete statement bound to the id it marks as deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoftDelete {
    pub short_id: String,
}

/// Destination of flushed statement batches.
#[async_trait]
pub trait BatchSink: Send + Sync + 'static {
    /// Applies one batch. Called with between 1 and `flush_threshold` statements.
    async fn flush(&self, batch: Vec<SoftDelete>) -> RepositoryResult<()>;
}

/// Flushes batches as one `UPDATE ... WHERE short_id = ANY($1)` round trip.
pub struct PgSoftDeleteSink {
    pool: Arc<PgPool>,
}

impl PgSoftDeleteSink {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BatchSink for PgSoftDeleteSink {
    async fn flush(&self, batch: Vec<SoftDelete>) -> RepositoryResult<()> {
        let ids: Vec<String> = batch.into_iter().map(|stmt| stmt.short_id).collect();

        let result = sqlx::query("UPDATE url SET is_deleted = TRUE WHERE short_id = ANY($1)")
            .bind(&ids)
            .execute(self.pool.as_ref())
            .await?;

        metrics::counter!(URLS_DELETED_TOTAL).increment(result.rows_affected());

        Ok(())
    }
}

/// Batched soft-delete runner.
pub struct DeletePipeline<S> {
    sink: Arc<S>,
    settings: DeleteSettings,
}

impl<S> Clone for DeletePipeline<S> {
    fn clone(&self) -> Self {
        Self {
            sink: self.sink.clone(),
            settings: self.settings,
        }
    }
}

impl<S: BatchSink> DeletePipeline<S> {
    /// Creates a pipeline. Zero-valued settings are raised to 1.
    pub fn new(sink: Arc<S>, settings: DeleteSettings) -> Self {
        Self {
            sink,
            settings: DeleteSettings {
                max_lanes: settings.max_lanes.max(1),
                flush_threshold: settings.flush_threshold.max(1),
            },
        }
    }

    pub fn settings(&self) -> DeleteSettings {
        self.settings
    }

    /// Number of lanes used for `count` ids.
    pub fn lanes_for(&self, count: usize) -> usize {
        count.clamp(1, self.settings.max_lanes)
    }

    /// Soft-deletes every id, returning how many statements were flushed.
    ///
    /// # Errors
    ///
    /// Returns the first flush error. Remaining ids are not processed.
    pub async fn run(&self, ids: Vec<String>) -> RepositoryResult<usize> {
        if ids.is_empty() {
            return Ok(0);
        }

        let lanes = self.lanes_for(ids.len());
        let threshold = self.settings.flush_threshold;

        let (stmt_tx, mut stmt_rx) = mpsc::channel::<SoftDelete>(lanes);
        let mut lane_txs = Vec::with_capacity(lanes);
        let mut workers = JoinSet::new();

        for _ in 0..lanes {
            let (lane_tx, mut lane_rx) = mpsc::channel::<String>(1);
            lane_txs.push(lane_tx);

            let out = stmt_tx.clone();
            workers.spawn(async move {
                while let Some(short_id) = lane_rx.recv().await {
                    if out.send(SoftDelete { short_id }).await.is_err() {
                        break;
                    }
                }
            });
        }
        drop(stmt_tx);

        workers.spawn(async move {
            for (index, id) in ids.into_iter().enumerate() {
                if lane_txs[index % lanes].send(id).await.is_err() {
                    break;
                }
            }
        });

        let mut batch = Vec::with_capacity(threshold);
        let mut flushed = 0;

        while let Some(stmt) = stmt_rx.recv().await {
            batch.push(stmt);
            if batch.len() >= threshold {
                flushed += batch.len();
                self.sink.flush(std::mem::take(&mut batch)).await?;
            }
        }

        if !batch.is_empty() {
            flushed += batch.len();
            self.sink.flush(batch).await?;
        }

        while workers.join_next().await.is_some() {}

        debug!(flushed, lanes, "Soft-delete pipeline drained");
        Ok(flushed)
    }
}
