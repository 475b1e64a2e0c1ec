//! Unit normalization for raw container counters

use crate::models::{ContainerStats, NormalizedSample};

pub const NANOS_PER_UNIT: f64 = 1e9;
pub const BYTES_PER_KB: f64 = 1024.0;

/// Convert raw counters into cores, seconds and kilobytes.
///
/// Negative counters are passed through as-is.
pub fn normalize(stats: &ContainerStats) -> NormalizedSample {
    NormalizedSample {
        cpu_cores: stats.cpu.usage_nano_cores as f64 / NANOS_PER_UNIT,
        cpu_time_sec: stats.cpu.usage_core_nano_seconds as f64 / NANOS_PER_UNIT,
        mem_usage_kb: stats.memory.usage_bytes as f64 / BYTES_PER_KB,
        mem_working_kb: stats.memory.working_set_bytes as f64 / BYTES_PER_KB,
        rss_kb: stats.memory.rss_bytes as f64 / BYTES_PER_KB,
        logs_bytes: stats.logs.used_bytes as f64,
        rootfs_bytes: stats.rootfs.used_bytes as f64,
    }
}
