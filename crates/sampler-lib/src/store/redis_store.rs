//! Redis sorted-set backend

use super::SampleStore;
use crate::error::WriteError;
use crate::models::StoreKey;
use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::info;
use url::Url;

/// Connection settings for the Redis backend
#[derive(Debug, Clone)]
pub struct RedisStoreConfig {
    pub host: String,
    pub port: u16,
    pub db: i64,
    pub password: Option<String>,
}

impl Default for RedisStoreConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 6379,
            db: 0,
            password: None,
        }
    }
}

impl RedisStoreConfig {
    /// Connection URL in `redis://[:password@]host:port/db` form
    pub fn url(&self) -> Result<Url> {
        let mut url = Url::parse(&format!("redis://{}:{}/{}", self.host, self.port, self.db))
            .with_context(|| format!("Invalid Redis address {}:{}", self.host, self.port))?;

        if let Some(password) = self.password.as_deref().filter(|p| !p.is_empty()) {
            url.set_password(Some(password))
                .map_err(|_| anyhow::anyhow!("Redis URL cannot carry a password"))?;
        }

        Ok(url)
    }

    /// Address for logs, without credentials
    pub fn endpoint(&self) -> String {
        format!("{}:{}/{}", self.host, self.port, self.db)
    }
}

/// Sample store backed by Redis sorted sets
///
/// The connection manager reconnects on its own after a dropped
/// connection, so a store outage surfaces as failed writes for the ticks
/// it spans rather than a dead sampler.
#[derive(Clone)]
pub struct RedisStore {
    manager: ConnectionManager,
    endpoint: String,
}

impl RedisStore {
    /// Connect to Redis
    pub async fn connect(config: &RedisStoreConfig) -> Result<Self> {
        let url = config.url()?;
        let client = redis::Client::open(url.as_str()).context("Invalid Redis connection info")?;
        let manager = ConnectionManager::new(client)
            .await
            .with_context(|| format!("Unable to connect to Redis at {}", config.endpoint()))?;

        info!(endpoint = %config.endpoint(), "Connected to Redis");

        Ok(Self {
            manager,
            endpoint: config.endpoint(),
        })
    }

    /// Round-trip a PING
    pub async fn ping(&self) -> Result<()> {
        let mut con = self.manager.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut con)
            .await
            .with_context(|| format!("Redis at {} did not answer PING", self.endpoint))?;
        Ok(())
    }
}

#[async_trait]
impl SampleStore for RedisStore {
    async fn append(&self, key: &StoreKey, score: i64, member: &str) -> Result<(), WriteError> {
        let mut con = self.manager.clone();
        con.zadd::<_, _, _, ()>(key.as_str(), member, score).await?;
        Ok(())
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<StoreKey>> {
        let mut con = self.manager.clone();
        let mut keys = Vec::new();
        {
            let mut iter: redis::AsyncIter<String> = con
                .scan_match(pattern)
                .await
                .with_context(|| format!("Failed to scan keys matching {}", pattern))?;
            while let Some(key) = iter.next_item().await {
                keys.push(StoreKey::from_raw(key));
            }
        }

        // SCAN may return a key more than once
        keys.sort();
        keys.dedup();
        Ok(keys)
    }

    async fn range(&self, key: &StoreKey) -> Result<Vec<(String, i64)>> {
        let mut con = self.manager.clone();
        let entries: Vec<(String, f64)> = con
            .zrange_withscores(key.as_str(), 0, -1)
            .await
            .with_context(|| format!("Failed to read {}", key))?;

        Ok(entries
            .into_iter()
            .map(|(member, score)| (member, score as i64))
            .collect())
    }
}
