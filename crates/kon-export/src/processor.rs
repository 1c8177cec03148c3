//! Validation and normalisation of decoded samples.

use std::collections::HashMap;

use base64::Engine as _;
use chrono::{DateTime, Utc};
use kon_proto::{BatchMetricsRequest, Metric, MetricType};
use serde::{Serialize, Serializer};

/// A validated sample, as held by the store and returned by the query API.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessedMetric {
    /// Sending agent; empty for samples that arrived outside a batch.
    pub agent_id: String,
    /// Sample time.
    pub timestamp: DateTime<Utc>,
    /// Metric name.
    pub name: String,
    /// Sample value.
    pub value: f64,
    /// Free-form labels.
    pub labels: HashMap<String, String>,
    /// Canonical type name, e.g. `CPU_USAGE`.
    #[serde(rename = "type")]
    pub metric_type: String,
    /// Typed form of `metric_type`.
    #[serde(skip)]
    pub raw_type: MetricType,
    /// Opaque payload, base64 encoded in JSON.
    #[serde(
        skip_serializing_if = "Vec::is_empty",
        serialize_with = "serialize_base64"
    )]
    pub payload: Vec<u8>,
}

fn serialize_base64<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes))
}

/// Reasons a sample is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Metric name is empty.
    #[error("metric name is empty")]
    EmptyName,

    /// Timestamp is not a positive, representable millisecond instant.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(i64),

    /// Metric type lies outside the defined range.
    #[error("invalid metric type: {0}")]
    InvalidType(i32),
}

/// Result of processing a batch: accepted samples in order plus a
/// rejection count.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchOutcome {
    /// Samples that passed validation.
    pub accepted: Vec<ProcessedMetric>,
    /// Number of samples skipped.
    pub rejected: usize,
}

/// Turns wire samples into stored samples.
pub trait Processor: Send + Sync {
    /// Validate and normalise one sample.
    fn process_single_metric(
        &self,
        agent_id: &str,
        metric: &Metric,
    ) -> Result<ProcessedMetric, ValidationError>;

    /// Validate every sample in a batch independently.
    ///
    /// Invalid samples are logged and skipped; the rest are accepted.
    fn process_batch_request(&self, batch: &BatchMetricsRequest) -> BatchOutcome {
        let mut outcome = BatchOutcome {
            accepted: Vec::with_capacity(batch.metrics.len()),
            rejected: 0,
        };

        for metric in &batch.metrics {
            match self.process_single_metric(&batch.agent_id, metric) {
                Ok(processed) => outcome.accepted.push(processed),
                Err(e) => {
                    tracing::warn!(
                        agent_id = %batch.agent_id,
                        metric = %metric.name,
                        error = %e,
                        "Skipping invalid metric in batch"
                    );
                    outcome.rejected += 1;
                }
            }
        }

        outcome
    }
}

/// Standard validation rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultProcessor;

impl DefaultProcessor {
    pub fn new() -> Self {
        Self
    }
}

impl Processor for DefaultProcessor {
    fn process_single_metric(
        &self,
        agent_id: &str,
        metric: &Metric,
    ) -> Result<ProcessedMetric, ValidationError> {
        if metric.name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if metric.timestamp <= 0 {
            return Err(ValidationError::InvalidTimestamp(metric.timestamp));
        }
        let timestamp = DateTime::from_timestamp_millis(metric.timestamp)
            .ok_or(ValidationError::InvalidTimestamp(metric.timestamp))?;
        let raw_type = MetricType::try_from(metric.r#type)
            .map_err(|_| ValidationError::InvalidType(metric.r#type))?;

        Ok(ProcessedMetric {
            agent_id: agent_id.to_owned(),
            timestamp,
            name: metric.name.clone(),
            value: metric.value,
            labels: metric.labels.clone(),
            metric_type: raw_type.as_str_name().to_owned(),
            raw_type,
            payload: metric.payload.clone(),
        })
    }
}
