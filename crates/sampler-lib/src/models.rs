//! Core data models for the utilization sampler
//!
//! The summary types mirror the subset of the kubelet `stats/summary`
//! document the sampler consumes. Field names are kept in camelCase on the
//! wire so a decoded summary re-serializes to the same shape.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Prefix shared by every sample collection in the store
pub const STORE_KEY_PREFIX: &str = "util";

/// Decoded summary for a single node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSummary {
    pub pods: Vec<PodStats>,
}

/// Per-pod statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodStats {
    #[serde(default, deserialize_with = "null_as_default")]
    pub pod_ref: PodRef,
    #[serde(default, deserialize_with = "null_as_default")]
    pub containers: Vec<ContainerStats>,
}

impl PodStats {
    pub fn name(&self) -> &str {
        &self.pod_ref.name
    }

    pub fn namespace(&self) -> &str {
        &self.pod_ref.namespace
    }
}

/// Pod identity as reported by the kubelet
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PodRef {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub namespace: String,
}

/// Raw counters for one container
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerStats {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub cpu: CpuStats,
    #[serde(default, deserialize_with = "null_as_default")]
    pub memory: MemoryStats,
    #[serde(default, deserialize_with = "null_as_default")]
    pub logs: FsStats,
    #[serde(default, deserialize_with = "null_as_default")]
    pub rootfs: FsStats,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CpuStats {
    /// Instantaneous usage rate in nanocores
    #[serde(default, deserialize_with = "null_as_default")]
    pub usage_nano_cores: i64,
    /// Cumulative usage in core-nanoseconds
    #[serde(default, deserialize_with = "null_as_default")]
    pub usage_core_nano_seconds: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryStats {
    #[serde(default, deserialize_with = "null_as_default")]
    pub usage_bytes: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub working_set_bytes: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub rss_bytes: i64,
}

/// Filesystem usage, shared by the `logs` and `rootfs` groups
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FsStats {
    #[serde(default, deserialize_with = "null_as_default")]
    pub used_bytes: i64,
}

/// The kubelet emits `null` for groups it could not read; treat those the
/// same as an absent field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Sample converted to human-consumable units
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NormalizedSample {
    pub cpu_cores: f64,
    pub cpu_time_sec: f64,
    pub mem_usage_kb: f64,
    pub mem_working_kb: f64,
    pub rss_kb: f64,
    pub logs_bytes: f64,
    pub rootfs_bytes: f64,
}

impl NormalizedSample {
    /// Metric names in serialization order
    pub const METRIC_NAMES: [&'static str; 7] = [
        "cpu_cores",
        "cpu_time_sec",
        "mem_usage_kb",
        "mem_working_kb",
        "rss_kb",
        "logs_bytes",
        "rootfs_bytes",
    ];

    /// Metric name/value pairs in serialization order
    pub fn metrics(&self) -> [(&'static str, f64); 7] {
        [
            ("cpu_cores", self.cpu_cores),
            ("cpu_time_sec", self.cpu_time_sec),
            ("mem_usage_kb", self.mem_usage_kb),
            ("mem_working_kb", self.mem_working_kb),
            ("rss_kb", self.rss_kb),
            ("logs_bytes", self.logs_bytes),
            ("rootfs_bytes", self.rootfs_bytes),
        ]
    }

    /// Look up a metric by name
    pub fn get(&self, name: &str) -> Option<f64> {
        self.metrics()
            .into_iter()
            .find(|(metric, _)| *metric == name)
            .map(|(_, value)| value)
    }

    /// Render the store member string
    pub fn to_member(&self) -> String {
        format!(
            concat!(
                "cpu_cores={:.6}, cpu_time_sec={:.2}, mem_usage_kb={:.2}, ",
                "mem_working_kb={:.2}, rss_kb={:.2}, logs_bytes={:.0}, rootfs_bytes={:.0}",
            ),
            self.cpu_cores,
            self.cpu_time_sec,
            self.mem_usage_kb,
            self.mem_working_kb,
            self.rss_kb,
            self.logs_bytes,
            self.rootfs_bytes,
        )
    }
}

/// Identifier of one per-(pod, container) collection in the store
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StoreKey(String);

impl StoreKey {
    pub fn new(pod_name: &str, container_name: &str) -> Self {
        Self(format!("{}:{}:{}", STORE_KEY_PREFIX, pod_name, container_name))
    }

    /// Wrap a raw key read back from the store
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split back into (pod, container) if the key has the sampler's shape
    pub fn parts(&self) -> Option<(&str, &str)> {
        let mut parts = self.0.splitn(3, ':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(STORE_KEY_PREFIX), Some(pod), Some(container)) => Some((pod, container)),
            _ => None,
        }
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for StoreKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// One appended entry: score is the write timestamp in milliseconds
#[derive(Debug, Clone, PartialEq)]
pub struct StoreEntry {
    pub key: StoreKey,
    pub timestamp_ms: i64,
    pub member: String,
}
