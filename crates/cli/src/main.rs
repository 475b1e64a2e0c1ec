//! Utilization Sampler CLI
//!
//! A command-line tool for listing, inspecting and exporting the
//! per-container utilization samples recorded by `util-sampler`.

mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::samples;
use sampler_lib::store::{RedisStore, RedisStoreConfig, DEFAULT_KEY_PATTERN};

/// Utilization Sampler CLI
#[derive(Parser)]
#[command(name = "usctl")]
#[command(author, version, about = "CLI for Utilization Sampler data", long_about = None)]
pub struct Cli {
    /// Redis host
    #[arg(long, env = "REDIS_HOST", default_value = "localhost")]
    pub redis_host: String,

    /// Redis port
    #[arg(long, env = "REDIS_PORT", default_value_t = 6379)]
    pub redis_port: u16,

    /// Redis database index
    #[arg(long, env = "REDIS_DB", default_value_t = 0)]
    pub redis_db: i64,

    /// Redis password
    #[arg(long, env = "REDIS_PASSWORD", hide_env_values = true)]
    pub redis_password: Option<String>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List sample collections
    Keys {
        /// Key pattern (glob, `*` wildcard)
        #[arg(long, short, default_value = DEFAULT_KEY_PATTERN)]
        pattern: String,
    },

    /// Show samples for one container
    Show {
        /// Pod name
        pod: String,

        /// Container name
        container: String,

        /// Show only the newest N samples
        #[arg(long, short)]
        limit: Option<usize>,
    },

    /// Export samples as CSV
    Export {
        /// Key pattern (glob, `*` wildcard)
        #[arg(long, short, env = "KEY_GLOB", default_value = DEFAULT_KEY_PATTERN)]
        pattern: String,

        /// Output file path, `-` for stdout
        #[arg(long, short, env = "CSV_FILE", default_value = "cpu_metrics.csv")]
        output: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let store = RedisStore::connect(&RedisStoreConfig {
        host: cli.redis_host,
        port: cli.redis_port,
        db: cli.redis_db,
        password: cli.redis_password.filter(|p| !p.is_empty()),
    })
    .await?;

    match cli.command {
        Commands::Keys { pattern } => {
            samples::list_keys(&store, &pattern, cli.format).await?;
        }
        Commands::Show {
            pod,
            container,
            limit,
        } => {
            samples::show_samples(&store, &pod, &container, limit, cli.format).await?;
        }
        Commands::Export { pattern, output } => {
            samples::export_csv(&store, &pattern, &output).await?;
        }
    }

    Ok(())
}
