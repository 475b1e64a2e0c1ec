//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print a table from a list of items
pub fn print_table<T: Tabled + Serialize>(items: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                println!("{}", "No items found".yellow());
                return;
            }
            let table = Table::new(items).with(Style::rounded()).to_string();
            println!("{}", table);
        }
        OutputFormat::Json => {
            if let Ok(json) = serde_json::to_string_pretty(&items) {
                println!("{}", json);
            }
        }
    }
}

/// Print a success message
pub fn print_success(message: &str) {
    eprintln!("{} {}", "✓".green().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow().bold(), message);
}

/// Format kibibytes as a human-readable size
pub fn format_kb(kb: Option<f64>) -> String {
    match kb {
        Some(kb) => format_bytes(kb * 1024.0),
        None => "-".to_string(),
    }
}

/// Format bytes as a human-readable size
pub fn format_bytes(bytes: f64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    if bytes >= GB {
        format!("{:.2}Gi", bytes / GB)
    } else if bytes >= MB {
        format!("{:.2}Mi", bytes / MB)
    } else if bytes >= KB {
        format!("{:.2}Ki", bytes / KB)
    } else {
        format!("{}B", bytes)
    }
}

/// Format fractional cores as millicores below one core
pub fn format_cores(cores: Option<f64>) -> String {
    match cores {
        Some(c) if c.abs() >= 1.0 => format!("{:.2}", c),
        Some(c) => format!("{:.0}m", c * 1000.0),
        None => "-".to_string(),
    }
}
