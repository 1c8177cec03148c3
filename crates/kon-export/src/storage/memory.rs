use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::RwLock;

use super::MetricStore;
use crate::processor::ProcessedMetric;

/// In-memory store bounded by count and by sample age.
///
/// Capacity eviction follows insertion order. Expiry follows sample
/// timestamps but stops at the first fresh sample, so a sample that arrived
/// late with an old timestamp survives until everything ahead of it expires.
#[derive(Debug)]
pub struct MemoryStore {
    metrics: RwLock<VecDeque<ProcessedMetric>>,
    max_size: usize,
    expire_time: Duration,
    expire_delta: TimeDelta,
}

impl MemoryStore {
    pub fn new(max_size: usize, expire_time: Duration) -> Self {
        Self {
            metrics: RwLock::new(VecDeque::new()),
            max_size,
            expire_time,
            expire_delta: TimeDelta::from_std(expire_time).unwrap_or(TimeDelta::MAX),
        }
    }

    #[must_use]
    pub const fn max_size(&self) -> usize {
        self.max_size
    }

    #[must_use]
    pub const fn expire_time(&self) -> Duration {
        self.expire_time
    }

    /// Expire relative to an explicit clock reading.
    ///
    /// Everything before the first sample with `timestamp >= now - expire_time`
    /// is dropped. With no such sample the store is emptied.
    pub async fn evict_expired_at(&self, now: DateTime<Utc>) -> usize {
        let cutoff = now
            .checked_sub_signed(self.expire_delta)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        let mut metrics = self.metrics.write().await;
        let first_fresh = metrics
            .iter()
            .position(|m| m.timestamp >= cutoff)
            .unwrap_or(metrics.len());
        metrics.drain(..first_fresh);

        if first_fresh > 0 {
            tracing::debug!(
                dropped = first_fresh,
                total = metrics.len(),
                %cutoff,
                "Expired metrics"
            );
        }
        first_fresh
    }

    async fn newest_matching<F>(&self, limit: usize, predicate: F) -> Vec<ProcessedMetric>
    where
        F: Fn(&ProcessedMetric) -> bool + Send,
    {
        let metrics = self.metrics.read().await;
        metrics
            .iter()
            .rev()
            .filter(|m| predicate(m))
            .take(limit)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl MetricStore for MemoryStore {
    async fn write(&self, batch: Vec<ProcessedMetric>) {
        if batch.is_empty() {
            return;
        }
        let saved = batch.len();

        let mut metrics = self.metrics.write().await;
        metrics.extend(batch);
        let dropped = metrics.len().saturating_sub(self.max_size);
        metrics.drain(..dropped);

        tracing::debug!(saved, total = metrics.len(), dropped, "Saved metrics");
    }

    async fn query_by_agent(&self, agent_id: &str, limit: usize) -> Vec<ProcessedMetric> {
        self.newest_matching(limit, |m| m.agent_id == agent_id).await
    }

    async fn query_by_type(&self, metric_type: &str, limit: usize) -> Vec<ProcessedMetric> {
        self.newest_matching(limit, |m| m.metric_type == metric_type)
            .await
    }

    async fn query_by_time_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: usize,
    ) -> Vec<ProcessedMetric> {
        self.newest_matching(limit, |m| m.timestamp >= start && m.timestamp <= end)
            .await
    }

    async fn query_latest(&self, limit: usize) -> Vec<ProcessedMetric> {
        let metrics = self.metrics.read().await;
        let skip = metrics.len().saturating_sub(limit);
        metrics.iter().skip(skip).cloned().collect()
    }

    async fn evict_expired(&self) -> usize {
        self.evict_expired_at(Utc::now()).await
    }

    async fn len(&self) -> usize {
        self.metrics.read().await.len()
    }
}
