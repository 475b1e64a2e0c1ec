//! Sampler configuration
//!
//! Read from unprefixed environment variables (`NODE_NAMES`,
//! `KUBELET_HOST`, ...), optionally layered over a file named by
//! `SAMPLER_CONFIG_FILE`. Environment values win over the file.

use anyhow::{Context, Result};
use sampler_lib::collector::{FetchStrategy, DEFAULT_NAMESPACE};
use sampler_lib::store::RedisStoreConfig;
use serde::Deserialize;
use std::time::Duration;

/// Environment variable naming an optional config file
pub const CONFIG_FILE_ENV: &str = "SAMPLER_CONFIG_FILE";

/// Where samples are written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Redis,
    /// Keep samples in process memory; nothing survives a restart
    Memory,
}

/// Sampler configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SamplerConfig {
    /// Comma-separated node names, required
    #[serde(default)]
    pub node_names: Option<String>,

    /// API server proxy host
    #[serde(default = "default_kubelet_host")]
    pub kubelet_host: String,

    #[serde(default = "default_kubelet_port")]
    pub kubelet_port: u16,

    #[serde(default = "default_redis_host")]
    pub redis_host: String,

    #[serde(default = "default_redis_port")]
    pub redis_port: u16,

    #[serde(default)]
    pub redis_db: i64,

    #[serde(default)]
    pub redis_password: Option<String>,

    /// Tick cadence in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Namespace whose pods are sampled
    #[serde(default = "default_namespace_filter")]
    pub namespace_filter: String,

    /// Per-request timeout for summary fetches
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,

    /// Node fetches in flight per tick; 1 is sequential
    #[serde(default = "default_fetch_concurrency")]
    pub fetch_concurrency: usize,

    #[serde(default)]
    pub store_backend: StoreBackend,

    /// Port for /healthz, /readyz and /metrics
    #[serde(default = "default_api_port")]
    pub api_port: u16,
}

fn default_kubelet_host() -> String {
    "localhost".to_string()
}

fn default_kubelet_port() -> u16 {
    8001
}

fn default_redis_host() -> String {
    "localhost".to_string()
}

fn default_redis_port() -> u16 {
    6379
}

fn default_poll_interval_ms() -> u64 {
    100
}

fn default_namespace_filter() -> String {
    DEFAULT_NAMESPACE.to_string()
}

fn default_fetch_timeout_ms() -> u64 {
    5000
}

fn default_fetch_concurrency() -> usize {
    1
}

fn default_api_port() -> u16 {
    8080
}

impl SamplerConfig {
    /// Load configuration from the process environment and optional file
    pub fn load() -> Result<Self> {
        let file = std::env::var(CONFIG_FILE_ENV).ok().filter(|p| !p.is_empty());
        Self::load_from(file.as_deref(), config::Environment::default())
    }

    /// Load from an explicit environment source, over an optional file
    pub fn load_from(file: Option<&str>, env: config::Environment) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::with_name(path).required(true));
        }

        let config: Self = builder
            .add_source(env)
            .build()
            .context("Failed to read sampler configuration")?
            .try_deserialize()
            .context("Invalid sampler configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the sampler cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.nodes().is_empty() {
            anyhow::bail!("NODE_NAMES must list at least one node");
        }
        if self.poll_interval_ms == 0 {
            anyhow::bail!("POLL_INTERVAL_MS must be greater than zero");
        }
        if self.fetch_timeout_ms == 0 {
            anyhow::bail!("FETCH_TIMEOUT_MS must be greater than zero");
        }
        if self.namespace_filter.is_empty() {
            anyhow::bail!("NAMESPACE_FILTER must not be empty");
        }
        Ok(())
    }

    /// Node names, trimmed, empties dropped, in configured order
    pub fn nodes(&self) -> Vec<String> {
        self.node_names
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn strategy(&self) -> FetchStrategy {
        FetchStrategy::from_concurrency(self.fetch_concurrency)
    }

    pub fn redis(&self) -> RedisStoreConfig {
        RedisStoreConfig {
            host: self.redis_host.clone(),
            port: self.redis_port,
            db: self.redis_db,
            password: self.redis_password.clone().filter(|p| !p.is_empty()),
        }
    }
}
