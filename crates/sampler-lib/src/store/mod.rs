//! Sample store backends
//!
//! Samples live in per-(pod, container) sorted collections keyed by
//! [`StoreKey`], scored by write time in milliseconds. The trait covers the
//! append path used by the sampler and the read path used by `usctl`.

mod memory;
mod redis_store;
mod writer;

pub use memory::MemoryStore;
pub use redis_store::{RedisStore, RedisStoreConfig};
pub use writer::{Clock, SampleWriter, SystemClock};

use crate::error::WriteError;
use crate::models::StoreKey;
use anyhow::Result;
use async_trait::async_trait;

/// Default pattern matching every sample collection
pub const DEFAULT_KEY_PATTERN: &str = "util:*";

/// A sorted-collection store
#[async_trait]
pub trait SampleStore: Send + Sync {
    /// Append `member` to the collection at `key` with the given score.
    ///
    /// Redis keeps one entry per distinct member, so an identical member
    /// written twice under the same key moves to the newer score.
    async fn append(&self, key: &StoreKey, score: i64, member: &str)
        -> std::result::Result<(), WriteError>;

    /// Keys matching a glob pattern (`*`, `?` and `[..]`, as Redis `MATCH`)
    async fn keys(&self, pattern: &str) -> Result<Vec<StoreKey>>;

    /// Every entry of one collection as (member, score), ascending by score
    async fn range(&self, key: &StoreKey) -> Result<Vec<(String, i64)>>;
}
