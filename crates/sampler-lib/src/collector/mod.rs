//! Utilization sampling from kubelet summaries
//!
//! This module provides the sampling pipeline: fetching `stats/summary`
//! documents per node, decoding them, keeping pods from one namespace,
//! normalizing container counters and handing the result to the store.

mod decode;
mod fetcher;
mod filter;
mod r#loop;
mod normalize;


pub use decode::decode_summary;
pub use fetcher::{
    fetch_nodes, FetchStrategy, KubeletSummaryClient, NodeFetch, DEFAULT_FETCH_TIMEOUT,
};
pub use filter::NamespaceFilter;
pub use normalize::{normalize, BYTES_PER_KB, NANOS_PER_UNIT};
pub use r#loop::{
    IntervalTicker, NodeFailure, SamplingConfig, SamplingLoop, SamplingLoopBuilder,
    SchedulerState, TickReport, Ticker, WriteFailure, DEFAULT_NAMESPACE, DEFAULT_POLL_INTERVAL,
};

use crate::error::SampleError;
use crate::models::NodeSummary;

pub use async_trait::async_trait;

/// Trait for per-node summary sources
#[async_trait]
pub trait SummarySource: Send + Sync {
    /// Fetch and decode the summary for one node
    async fn fetch(&self, node: &str) -> Result<NodeSummary, SampleError>;
}
