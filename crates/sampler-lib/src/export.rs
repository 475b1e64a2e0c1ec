//! Reading samples back out of the store
//!
//! Members are parsed leniently: each metric is matched on its own
//! `name=<number>` pattern, so hand-written or older members with missing
//! or reordered fields still export, with empty cells for whatever is absent.

use crate::models::{NormalizedSample, StoreKey};
use crate::store::SampleStore;
use anyhow::{Context, Result};
use chrono::{SecondsFormat, TimeZone, Utc};
use regex::Regex;
use serde::Serialize;
use std::io::Write;
use std::sync::OnceLock;

/// CSV columns preceding the metric columns
pub const CSV_KEY_COLUMNS: [&str; 5] = ["key", "pod", "container", "timestamp_ms", "timestamp_utc"];

/// Metrics parsed out of one member string
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ParsedSample {
    pub cpu_cores: Option<f64>,
    pub cpu_time_sec: Option<f64>,
    pub mem_usage_kb: Option<f64>,
    pub mem_working_kb: Option<f64>,
    pub rss_kb: Option<f64>,
    pub logs_bytes: Option<f64>,
    pub rootfs_bytes: Option<f64>,
}

impl ParsedSample {
    /// Values in member order, for column output
    pub fn values(&self) -> [Option<f64>; 7] {
        [
            self.cpu_cores,
            self.cpu_time_sec,
            self.mem_usage_kb,
            self.mem_working_kb,
            self.rss_kb,
            self.logs_bytes,
            self.rootfs_bytes,
        ]
    }
}

/// Numeric literal in a member: sign, digits, fraction, exponent
const NUMBER: &str = r"[-+]?\d*\.?\d+(?:[eE][-+]?\d+)?";

/// One `name=<number>` pattern per metric, in member order
static MEMBER_PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();

fn member_patterns() -> &'static [Regex] {
    MEMBER_PATTERNS.get_or_init(|| {
        NormalizedSample::METRIC_NAMES
            .iter()
            .map(|name| {
                Regex::new(&format!(r"\b{}=({})", regex::escape(name), NUMBER))
                    .expect("Invalid member pattern")
            })
            .collect()
    })
}

/// Parse a member string such as `cpu_cores=0.250000, cpu_time_sec=12.00, ...`
pub fn parse_member(member: &str) -> ParsedSample {
    let values: Vec<Option<f64>> = member_patterns()
        .iter()
        .map(|pattern| {
            pattern
                .captures(member)
                .and_then(|caps| caps[1].parse().ok())
        })
        .collect();

    ParsedSample {
        cpu_cores: values[0],
        cpu_time_sec: values[1],
        mem_usage_kb: values[2],
        mem_working_kb: values[3],
        rss_kb: values[4],
        logs_bytes: values[5],
        rootfs_bytes: values[6],
    }
}

/// One stored entry, flattened for export
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRow {
    pub key: String,
    pub pod: String,
    pub container: String,
    pub timestamp_ms: i64,
    pub timestamp_utc: String,
    pub metrics: ParsedSample,
}

impl ExportRow {
    pub fn new(key: &StoreKey, member: &str, timestamp_ms: i64) -> Self {
        let (pod, container) = key.parts().unwrap_or(("", ""));
        Self {
            key: key.to_string(),
            pod: pod.to_string(),
            container: container.to_string(),
            timestamp_ms,
            timestamp_utc: format_timestamp(timestamp_ms),
            metrics: parse_member(member),
        }
    }
}

/// RFC 3339 UTC rendering of a millisecond timestamp; empty if out of range
pub fn format_timestamp(timestamp_ms: i64) -> String {
    Utc.timestamp_millis_opt(timestamp_ms)
        .single()
        .map(|ts| ts.to_rfc3339_opts(SecondsFormat::Millis, false))
        .unwrap_or_default()
}

/// Every entry of every key matching `pattern`, keys sorted, entries by score
pub async fn collect_rows(store: &dyn SampleStore, pattern: &str) -> Result<Vec<ExportRow>> {
    let mut rows = Vec::new();
    for key in store.keys(pattern).await? {
        let entries = store
            .range(&key)
            .await
            .with_context(|| format!("Failed to read entries for {}", key))?;
        rows.extend(
            entries
                .iter()
                .map(|(member, score)| ExportRow::new(&key, member, *score)),
        );
    }
    Ok(rows)
}

/// Write rows as CSV with a header line; returns the number of data rows
pub fn write_csv<W: Write>(rows: &[ExportRow], mut out: W) -> Result<usize> {
    let header: Vec<&str> = CSV_KEY_COLUMNS
        .iter()
        .copied()
        .chain(NormalizedSample::METRIC_NAMES)
        .collect();
    writeln!(out, "{}", header.join(","))?;

    for row in rows {
        let mut fields = vec![
            csv_field(&row.key),
            csv_field(&row.pod),
            csv_field(&row.container),
            row.timestamp_ms.to_string(),
            row.timestamp_utc.clone(),
        ];
        fields.extend(
            row.metrics
                .values()
                .iter()
                .map(|value| value.map(|v| v.to_string()).unwrap_or_default()),
        );
        writeln!(out, "{}", fields.join(","))?;
    }

    out.flush()?;
    Ok(rows.len())
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
