//! Sample inspection and export commands

use anyhow::{Context, Result};
use colored::Colorize;
use sampler_lib::export::{collect_rows, write_csv, ExportRow};
use sampler_lib::store::SampleStore;
use sampler_lib::StoreKey;
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter};
use tabled::Tabled;

use crate::output::{
    format_bytes, format_cores, format_kb, print_success, print_table, print_warning, OutputFormat,
};

/// Row for the keys table
#[derive(Debug, Tabled, Serialize)]
pub struct KeyRow {
    #[tabled(rename = "Key")]
    pub key: String,
    #[tabled(rename = "Pod")]
    pub pod: String,
    #[tabled(rename = "Container")]
    pub container: String,
    #[tabled(rename = "Samples")]
    pub samples: usize,
    #[tabled(rename = "Latest (UTC)")]
    pub latest: String,
}

/// Row for the samples table
#[derive(Debug, Tabled)]
struct SampleRow {
    #[tabled(rename = "Time (UTC)")]
    time: String,
    #[tabled(rename = "CPU")]
    cpu: String,
    #[tabled(rename = "CPU Time")]
    cpu_time: String,
    #[tabled(rename = "Mem Usage")]
    mem_usage: String,
    #[tabled(rename = "Working Set")]
    mem_working: String,
    #[tabled(rename = "RSS")]
    rss: String,
    #[tabled(rename = "Logs")]
    logs: String,
    #[tabled(rename = "Rootfs")]
    rootfs: String,
}

impl From<&ExportRow> for SampleRow {
    fn from(row: &ExportRow) -> Self {
        let m = &row.metrics;
        Self {
            time: row.timestamp_utc.clone(),
            cpu: format_cores(m.cpu_cores),
            cpu_time: m
                .cpu_time_sec
                .map(|s| format!("{:.2}s", s))
                .unwrap_or_else(|| "-".to_string()),
            mem_usage: format_kb(m.mem_usage_kb),
            mem_working: format_kb(m.mem_working_kb),
            rss: format_kb(m.rss_kb),
            logs: m.logs_bytes.map(format_bytes).unwrap_or_else(|| "-".to_string()),
            rootfs: m.rootfs_bytes.map(format_bytes).unwrap_or_else(|| "-".to_string()),
        }
    }
}

/// One row per sample collection matching `pattern`
pub async fn key_rows(store: &dyn SampleStore, pattern: &str) -> Result<Vec<KeyRow>> {
    let mut rows = Vec::new();
    for key in store.keys(pattern).await? {
        let entries = store.range(&key).await?;
        let (pod, container) = key.parts().unwrap_or(("", ""));
        rows.push(KeyRow {
            key: key.to_string(),
            pod: pod.to_string(),
            container: container.to_string(),
            samples: entries.len(),
            latest: entries
                .last()
                .map(|(_, score)| sampler_lib::export::format_timestamp(*score))
                .unwrap_or_default(),
        });
    }
    Ok(rows)
}

/// List sample collections
pub async fn list_keys(store: &dyn SampleStore, pattern: &str, format: OutputFormat) -> Result<()> {
    let rows = key_rows(store, pattern).await?;
    print_table(&rows, format);
    if format == OutputFormat::Table && !rows.is_empty() {
        println!("\nTotal: {} keys", rows.len());
    }
    Ok(())
}

/// Samples for one container, oldest first, keeping the newest `limit`
pub async fn container_samples(
    store: &dyn SampleStore,
    pod: &str,
    container: &str,
    limit: Option<usize>,
) -> Result<Vec<ExportRow>> {
    let key = StoreKey::new(pod, container);
    let entries = store.range(&key).await?;
    let skip = limit.map_or(0, |n| entries.len().saturating_sub(n));

    Ok(entries
        .iter()
        .skip(skip)
        .map(|(member, score)| ExportRow::new(&key, member, *score))
        .collect())
}

/// Show samples for one container
pub async fn show_samples(
    store: &dyn SampleStore,
    pod: &str,
    container: &str,
    limit: Option<usize>,
    format: OutputFormat,
) -> Result<()> {
    let rows = container_samples(store, pod, container, limit).await?;

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&rows)?;
            println!("{}", json);
        }
        OutputFormat::Table => {
            println!("{}", "Utilization Samples".bold());
            println!("{}", "=".repeat(60));
            println!("Pod:       {}", pod.cyan());
            println!("Container: {}", container.cyan());
            println!();

            if rows.is_empty() {
                print_warning("No samples found for this container");
                return Ok(());
            }

            let table_rows: Vec<SampleRow> = rows.iter().map(SampleRow::from).collect();
            let table = tabled::Table::new(table_rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);
            println!("\nTotal: {} samples", rows.len());
        }
    }

    Ok(())
}

/// Dump every matching sample as CSV to `output` (`-` for stdout)
pub async fn export_csv(store: &dyn SampleStore, pattern: &str, output: &str) -> Result<usize> {
    let rows = collect_rows(store, pattern).await?;

    let written = if output == "-" {
        write_csv(&rows, io::stdout().lock())?
    } else {
        let file = File::create(output).with_context(|| format!("Failed to create {}", output))?;
        write_csv(&rows, BufWriter::new(file))?
    };

    print_success(&format!(
        "Wrote {} rows to {} (pattern: {})",
        written, output, pattern
    ));
    Ok(written)
}
