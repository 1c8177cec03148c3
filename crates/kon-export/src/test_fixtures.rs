//! Shared builders and rstest fixtures for unit tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::DateTime;
use kon_proto::MetricType;
use rstest::fixture;

use crate::ingest::StreamPipeline;
use crate::processor::{DefaultProcessor, ProcessedMetric};
use crate::storage::MemoryStore;

/// 2024-01-01T00:00:00Z in epoch milliseconds.
pub const T0: i64 = 1_704_067_200_000;

/// A CPU sample for `agent_id` at `timestamp_ms`.
pub fn sample(agent_id: &str, name: &str, timestamp_ms: i64) -> ProcessedMetric {
    ProcessedMetric {
        agent_id: agent_id.to_owned(),
        timestamp: DateTime::from_timestamp_millis(timestamp_ms).unwrap(),
        name: name.to_owned(),
        value: 1.0,
        labels: HashMap::new(),
        metric_type: MetricType::CpuUsage.as_str_name().to_owned(),
        raw_type: MetricType::CpuUsage,
        payload: Vec::new(),
    }
}

/// A store large enough that tests never hit either bound.
#[fixture]
pub fn memory_store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::new(10_000, Duration::from_secs(365 * 24 * 60 * 60)))
}

/// A pipeline writing into [`memory_store`].
#[fixture]
pub fn pipeline(memory_store: Arc<MemoryStore>) -> (StreamPipeline, Arc<MemoryStore>) {
    let pipeline = StreamPipeline::new(Arc::new(DefaultProcessor), memory_store.clone());
    (pipeline, memory_store)
}
