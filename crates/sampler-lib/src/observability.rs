//! Observability infrastructure for the sampler
//!
//! Provides:
//! - Prometheus metrics (tick latency, samples written, per-stage errors)
//! - Structured JSON logging with tracing

use crate::collector::TickReport;
use crate::error::SampleError;
use crate::models::{StoreEntry, StoreKey};
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Tick latency buckets (in seconds), centred on the 100ms default cadence
const TICK_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.025, 0.05, 0.075, 0.1, 0.15, 0.25, 0.5, 1.0, 2.5, 5.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<SamplerMetricsInner> = OnceLock::new();

struct SamplerMetricsInner {
    tick_duration_seconds: Histogram,
    ticks: IntCounter,
    node_errors: IntCounterVec,
    write_errors: IntCounter,
    samples_written: IntCounter,
    pods_matched: IntGauge,
    nodes_configured: IntGauge,
}

impl SamplerMetricsInner {
    fn new() -> Self {
        Self {
            tick_duration_seconds: register_histogram!(
                "util_sampler_tick_duration_seconds",
                "Wall time of one fetch-normalize-write tick",
                TICK_BUCKETS.to_vec()
            )
            .expect("Failed to register tick_duration_seconds"),

            ticks: register_int_counter!(
                "util_sampler_ticks_total",
                "Total number of completed ticks"
            )
            .expect("Failed to register ticks_total"),

            node_errors: register_int_counter_vec!(
                "util_sampler_node_errors_total",
                "Nodes skipped in a tick, by failing stage",
                &["stage"]
            )
            .expect("Failed to register node_errors_total"),

            write_errors: register_int_counter!(
                "util_sampler_write_errors_total",
                "Container samples the store did not accept"
            )
            .expect("Failed to register write_errors_total"),

            samples_written: register_int_counter!(
                "util_sampler_samples_written_total",
                "Container samples appended to the store"
            )
            .expect("Failed to register samples_written_total"),

            pods_matched: register_int_gauge!(
                "util_sampler_pods_matched",
                "Pods in the sampled namespace during the last tick"
            )
            .expect("Failed to register pods_matched"),

            nodes_configured: register_int_gauge!(
                "util_sampler_nodes_configured",
                "Nodes polled on every tick"
            )
            .expect("Failed to register nodes_configured"),
        }
    }
}

/// Sampler metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct SamplerMetrics {
    _private: (),
}

impl Default for SamplerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl SamplerMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(SamplerMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &SamplerMetricsInner {
        GLOBAL_METRICS.get_or_init(SamplerMetricsInner::new)
    }

    pub fn observe_tick_latency(&self, duration_secs: f64) {
        self.inner().tick_duration_seconds.observe(duration_secs);
    }

    pub fn inc_ticks(&self) {
        self.inner().ticks.inc();
    }

    /// Count a skipped node under its failing stage (`fetch` or `decode`)
    pub fn inc_node_errors(&self, stage: &str) {
        self.inner().node_errors.with_label_values(&[stage]).inc();
    }

    pub fn inc_write_errors_by(&self, count: u64) {
        self.inner().write_errors.inc_by(count);
    }

    pub fn inc_samples_written_by(&self, count: u64) {
        self.inner().samples_written.inc_by(count);
    }

    pub fn set_pods_matched(&self, count: i64) {
        self.inner().pods_matched.set(count);
    }

    pub fn set_nodes_configured(&self, count: i64) {
        self.inner().nodes_configured.set(count);
    }
}

/// Structured logger for sampler events
#[derive(Clone)]
pub struct StructuredLogger {
    namespace: String,
}

impl StructuredLogger {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    /// Log sampler startup
    pub fn log_startup(&self, version: &str, nodes: &[String], interval: Duration) {
        info!(
            event = "sampler_started",
            namespace = %self.namespace,
            sampler_version = %version,
            nodes = ?nodes,
            interval_ms = interval.as_millis() as u64,
            "Utilization sampler started"
        );
    }

    /// Log sampler shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "sampler_shutdown",
            namespace = %self.namespace,
            reason = %reason,
            "Utilization sampler shutting down"
        );
    }

    /// A node was skipped for this tick
    pub fn log_node_error(&self, node: &str, error: &SampleError) {
        warn!(
            event = "node_skipped",
            node = %node,
            stage = error.stage(),
            error = %error,
            "Skipping node for this tick"
        );
    }

    pub fn log_sample_written(&self, entry: &StoreEntry) {
        debug!(
            event = "sample_written",
            key = %entry.key,
            timestamp_ms = entry.timestamp_ms,
            member = %entry.member,
            "Logging to Redis"
        );
    }

    pub fn log_write_error(&self, key: &StoreKey, error: &SampleError) {
        warn!(
            event = "write_failed",
            key = %key,
            error = %error,
            "Dropping sample for this tick"
        );
    }

    /// Per-tick summary, the equivalent of a loop-duration line
    pub fn log_tick(&self, report: &TickReport) {
        info!(
            event = "tick_completed",
            namespace = %self.namespace,
            tick = report.tick,
            elapsed_ms = report.elapsed.as_secs_f64() * 1000.0,
            nodes_fetched = report.nodes_fetched,
            node_errors = report.node_failures.len(),
            pods_matched = report.pods_matched,
            written = report.written.len(),
            write_errors = report.write_failures.len(),
            "Loop duration"
        );
    }

    /// The tick took longer than the poll interval; the next one starts late
    pub fn log_tick_overrun(&self, tick: u64, elapsed: Duration, interval: Duration) {
        warn!(
            event = "tick_overrun",
            tick = tick,
            elapsed_ms = elapsed.as_millis() as u64,
            interval_ms = interval.as_millis() as u64,
            "Tick exceeded poll interval, delaying next tick"
        );
    }
}
