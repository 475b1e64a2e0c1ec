//! Kubelet summary fetching
//!
//! One GET per node against the API server proxy path
//! `/api/v1/nodes/<node>/proxy/stats/summary`. Failures are returned per
//! node so a single bad node never takes down the rest of a tick.

use super::decode::decode_summary;
use super::SummarySource;
use crate::error::{FetchError, SampleError};
use crate::models::NodeSummary;
use anyhow::{Context, Result};
use async_trait::async_trait;
use futures_util::stream::{self, Stream, StreamExt};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Default per-request timeout
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Longest error body kept in a [`FetchError::Status`]
const MAX_ERROR_BODY: usize = 256;

/// HTTP client for kubelet `stats/summary` endpoints
pub struct KubeletSummaryClient {
    client: Client,
    base_url: Url,
    timeout: Duration,
}

impl KubeletSummaryClient {
    /// Create a client for the proxy at `host:port`
    pub fn new(host: &str, port: u16, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(&format!("http://{}:{}/", host, port))
            .with_context(|| format!("Invalid kubelet proxy address {}:{}", host, port))?;

        Self::with_base_url(base_url, timeout)
    }

    /// Create a client against an explicit base URL
    pub fn with_base_url(base_url: Url, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    /// Build the summary URL for a node
    pub fn summary_url(&self, node: &str) -> Result<Url, FetchError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| FetchError::InvalidUrl {
                node: node.to_string(),
                reason: "base url cannot carry a path".to_string(),
            })?
            .pop_if_empty()
            .extend(["api", "v1", "nodes", node, "proxy", "stats", "summary"]);
        Ok(url)
    }

    fn transport_error(&self, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout(self.timeout)
        } else {
            FetchError::Transport(e.to_string())
        }
    }
}

#[async_trait]
impl SummarySource for KubeletSummaryClient {
    async fn fetch(&self, node: &str) -> Result<NodeSummary, SampleError> {
        let url = self.summary_url(node)?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
            }
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let payload = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(e))?;

        Ok(decode_summary(&payload)?)
    }
}

/// How the nodes of one tick are fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchStrategy {
    /// One node after another
    #[default]
    Sequential,
    /// Up to `n` requests in flight
    Bounded(usize),
}

impl FetchStrategy {
    /// 0 or 1 means sequential
    pub fn from_concurrency(concurrency: usize) -> Self {
        if concurrency <= 1 {
            FetchStrategy::Sequential
        } else {
            FetchStrategy::Bounded(concurrency)
        }
    }

    /// Requests allowed in flight at once
    pub fn in_flight(&self) -> usize {
        match self {
            FetchStrategy::Sequential => 1,
            FetchStrategy::Bounded(limit) => (*limit).max(1),
        }
    }
}

/// Outcome of fetching one node
#[derive(Debug)]
pub struct NodeFetch {
    pub node: String,
    pub result: Result<NodeSummary, SampleError>,
}

/// Fetch every node once, as a stream yielding results in `nodes` order.
///
/// Requests start lazily as the stream is polled. With `Sequential` the
/// next node is not requested until the previous item has been taken, so a
/// consumer that writes each item before polling again sees fetch, write,
/// fetch, write.
pub fn fetch_nodes(
    source: Arc<dyn SummarySource>,
    nodes: &[String],
    strategy: FetchStrategy,
) -> impl Stream<Item = NodeFetch> + Send {
    let fetches: Vec<_> = nodes
        .iter()
        .map(|n| {
            let node = n.clone();
            let source = Arc::clone(&source);
            async move {
                let result = source.fetch(&node).await;
                NodeFetch { node, result }
            }
        })
        .collect();

    stream::iter(fetches).buffered(strategy.in_flight())
}
