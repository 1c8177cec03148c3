//! Sample storage.
//!
//! The store is the only state shared between ingestion streams, the expiry
//! sweeper and the query API. Its operations never fail.

mod memory;
mod sweeper;

pub use memory::MemoryStore;
pub use sweeper::{start_expiry_sweeper, SweepHandle};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::processor::ProcessedMetric;

/// A bounded collection of samples in insertion order.
///
/// Query methods scan from the most recently inserted sample and return
/// matches newest first, except [`MetricStore::query_latest`].
#[async_trait]
pub trait MetricStore: Send + Sync {
    /// Append samples, dropping the oldest when over capacity.
    async fn write(&self, metrics: Vec<ProcessedMetric>);

    async fn query_by_agent(&self, agent_id: &str, limit: usize) -> Vec<ProcessedMetric>;

    /// Match on the canonical type name, e.g. `CPU_USAGE`.
    async fn query_by_type(&self, metric_type: &str, limit: usize) -> Vec<ProcessedMetric>;

    /// Samples with `start <= timestamp <= end`.
    async fn query_by_time_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: usize,
    ) -> Vec<ProcessedMetric>;

    /// The `limit` most recently inserted samples, oldest of them first.
    async fn query_latest(&self, limit: usize) -> Vec<ProcessedMetric>;

    /// Drop samples older than the configured age, returning how many went.
    async fn evict_expired(&self) -> usize;

    async fn len(&self) -> usize;

    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
