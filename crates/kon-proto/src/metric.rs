//! Protobuf message definitions for agent telemetry.
//!
//! These mirror the agent's `protocol` package. Field tags are part of the
//! wire contract with deployed agents and must not change.

use std::collections::HashMap;

/// Kind of telemetry a sample describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum MetricType {
    CpuUsage = 0,
    MemoryUsage = 1,
    DiskUsage = 2,
    NetworkTraffic = 3,
    ProcessInfo = 4,
    EbpfRaw = 5,
}

impl MetricType {
    /// All defined metric types, in wire order.
    pub const ALL: [Self; 6] = [
        Self::CpuUsage,
        Self::MemoryUsage,
        Self::DiskUsage,
        Self::NetworkTraffic,
        Self::ProcessInfo,
        Self::EbpfRaw,
    ];

    /// Returns the protobuf enum value name, e.g. `"CPU_USAGE"`.
    #[must_use]
    pub const fn as_str_name(self) -> &'static str {
        match self {
            Self::CpuUsage => "CPU_USAGE",
            Self::MemoryUsage => "MEMORY_USAGE",
            Self::DiskUsage => "DISK_USAGE",
            Self::NetworkTraffic => "NETWORK_TRAFFIC",
            Self::ProcessInfo => "PROCESS_INFO",
            Self::EbpfRaw => "EBPF_RAW",
        }
    }

    /// Parses a protobuf enum value name.
    #[must_use]
    pub fn from_str_name(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str_name() == value)
    }
}

impl std::fmt::Display for MetricType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str_name())
    }
}

/// A single telemetry sample.
#[derive(Clone, PartialEq, prost::Message)]
pub struct Metric {
    /// Metric name.
    #[prost(string, tag = "1")]
    pub name: String,
    /// Sample value.
    #[prost(double, tag = "2")]
    pub value: f64,
    /// Sample time in milliseconds since the Unix epoch.
    #[prost(int64, tag = "3")]
    pub timestamp: i64,
    /// Free-form labels.
    #[prost(map = "string, string", tag = "4")]
    pub labels: HashMap<String, String>,
    /// Raw [`MetricType`] value; may lie outside the defined range.
    #[prost(enumeration = "MetricType", tag = "5")]
    pub r#type: i32,
    /// Opaque payload, e.g. raw eBPF event bytes.
    #[prost(bytes = "vec", tag = "6")]
    pub payload: Vec<u8>,
}

/// Many samples pushed by one agent in a single frame.
#[derive(Clone, PartialEq, prost::Message)]
pub struct BatchMetricsRequest {
    /// Identifier of the sending agent.
    #[prost(string, tag = "1")]
    pub agent_id: String,
    /// Time the batch was assembled, in milliseconds since the Unix epoch.
    #[prost(int64, tag = "2")]
    pub timestamp: i64,
    /// Samples in the batch.
    #[prost(message, repeated, tag = "3")]
    pub metrics: Vec<Metric>,
}
