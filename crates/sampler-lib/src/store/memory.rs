//! In-process sample store
//!
//! Keeps every appended entry in append order. Used by tests and as the
//! `memory` backend for dry runs without a Redis instance.

use super::SampleStore;
use crate::error::WriteError;
use crate::models::{StoreEntry, StoreKey};
use anyhow::{Context, Result};
use async_trait::async_trait;
use glob::Pattern;
use std::collections::BTreeMap;
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: Mutex<BTreeMap<StoreKey, Vec<(String, i64)>>>,
    log: Mutex<Vec<StoreEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every append across all keys, in the order it happened
    pub fn appended(&self) -> Vec<StoreEntry> {
        self.log.lock().map(|log| log.clone()).unwrap_or_default()
    }

    /// Entries under one key, in append order
    pub fn entries(&self, key: &StoreKey) -> Vec<(String, i64)> {
        self.collections
            .lock()
            .ok()
            .and_then(|collections| collections.get(key).cloned())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.log.lock().map(|log| log.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SampleStore for MemoryStore {
    async fn append(&self, key: &StoreKey, score: i64, member: &str) -> Result<(), WriteError> {
        let mut collections = self
            .collections
            .lock()
            .map_err(|_| WriteError::Unavailable("memory store poisoned".to_string()))?;
        let mut log = self
            .log
            .lock()
            .map_err(|_| WriteError::Unavailable("memory store poisoned".to_string()))?;

        collections
            .entry(key.clone())
            .or_default()
            .push((member.to_string(), score));
        log.push(StoreEntry {
            key: key.clone(),
            timestamp_ms: score,
            member: member.to_string(),
        });
        Ok(())
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<StoreKey>> {
        let pattern = Pattern::new(pattern)
            .with_context(|| format!("Invalid key pattern {:?}", pattern))?;
        let collections = self
            .collections
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store poisoned"))?;

        Ok(collections
            .keys()
            .filter(|key| pattern.matches(key.as_str()))
            .cloned()
            .collect())
    }

    async fn range(&self, key: &StoreKey) -> Result<Vec<(String, i64)>> {
        let mut entries = self.entries(key);
        entries.sort_by_key(|(_, score)| *score);
        Ok(entries)
    }
}
