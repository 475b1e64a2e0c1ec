//! Sampling loop
//!
//! Drives the pipeline on a fixed cadence. Each tick walks the configured
//! nodes in order; as soon as a node's summary arrives its pods from the
//! configured namespace are normalized and appended to the store, before
//! the next node's result is taken. A tick always runs to completion before
//! the next one is considered; an overrunning tick pushes the next boundary
//! back instead of overlapping or bursting to catch up.

use super::fetcher::{fetch_nodes, FetchStrategy, NodeFetch};
use super::filter::NamespaceFilter;
use super::normalize::normalize;
use super::SummarySource;
use crate::error::SampleError;
use crate::health::HealthRegistry;
use crate::models::{StoreEntry, StoreKey};
use crate::observability::{SamplerMetrics, StructuredLogger};
use crate::store::{Clock, SampleStore, SampleWriter, SystemClock};
use anyhow::Result;
use async_trait::async_trait;
use futures_util::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::time::{interval, Instant, Interval, MissedTickBehavior};
use tracing::info;

/// Default tick cadence
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Default namespace retained by the filter
pub const DEFAULT_NAMESPACE: &str = "default";

/// Configuration for the sampling loop
#[derive(Debug, Clone)]
pub struct SamplingConfig {
    /// Tick cadence (default: 100 milliseconds)
    pub interval: Duration,
    /// Nodes fetched on every tick, in this order
    pub nodes: Vec<String>,
    /// Namespace whose pods are sampled
    pub namespace: String,
    /// Sequential or bounded-parallel node fetches
    pub strategy: FetchStrategy,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            nodes: Vec::new(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            strategy: FetchStrategy::Sequential,
        }
    }
}

/// Scheduler state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Waiting for the next tick boundary
    Idle,
    /// Processing a tick
    Running,
}

/// Source of tick boundaries
#[async_trait]
pub trait Ticker: Send {
    /// Resolve at the next tick boundary
    async fn tick(&mut self);
}

/// Ticker backed by `tokio::time::interval`
///
/// The first tick fires immediately. Missed ticks are delayed, not burst.
pub struct IntervalTicker {
    interval: Interval,
}

impl IntervalTicker {
    pub fn new(period: Duration) -> Self {
        let mut interval = interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval }
    }
}

#[async_trait]
impl Ticker for IntervalTicker {
    async fn tick(&mut self) {
        self.interval.tick().await;
    }
}

/// A node whose summary could not be obtained this tick
#[derive(Debug)]
pub struct NodeFailure {
    pub node: String,
    pub error: SampleError,
}

/// A container sample that could not be written this tick
#[derive(Debug)]
pub struct WriteFailure {
    pub key: StoreKey,
    pub error: SampleError,
}

/// Everything that happened during one tick
#[derive(Debug, Default)]
pub struct TickReport {
    pub tick: u64,
    pub nodes_fetched: usize,
    pub node_failures: Vec<NodeFailure>,
    pub pods_matched: usize,
    pub written: Vec<StoreEntry>,
    pub write_failures: Vec<WriteFailure>,
    pub elapsed: Duration,
}

impl TickReport {
    pub fn nodes_attempted(&self) -> usize {
        self.nodes_fetched + self.node_failures.len()
    }

    pub fn samples_attempted(&self) -> usize {
        self.written.len() + self.write_failures.len()
    }
}

/// Periodic fetch-normalize-write loop
pub struct SamplingLoop {
    source: Arc<dyn SummarySource>,
    writer: SampleWriter,
    filter: NamespaceFilter,
    config: SamplingConfig,
    health: Option<HealthRegistry>,
    metrics: Option<SamplerMetrics>,
    logger: StructuredLogger,
    state_tx: watch::Sender<SchedulerState>,
    tick_count: u64,
}

impl SamplingLoop {
    fn new(
        source: Arc<dyn SummarySource>,
        store: Arc<dyn SampleStore>,
        clock: Arc<dyn Clock>,
        config: SamplingConfig,
    ) -> Self {
        let (state_tx, _) = watch::channel(SchedulerState::Idle);

        Self {
            source,
            writer: SampleWriter::new(store, clock),
            filter: NamespaceFilter::new(config.namespace.clone()),
            logger: StructuredLogger::new(config.namespace.clone()),
            config,
            health: None,
            metrics: None,
            state_tx,
            tick_count: 0,
        }
    }

    /// Observe Idle/Running transitions
    pub fn subscribe_state(&self) -> watch::Receiver<SchedulerState> {
        self.state_tx.subscribe()
    }

    /// Start the loop on the configured interval
    pub async fn run(self, shutdown: broadcast::Receiver<()>) {
        let ticker = IntervalTicker::new(self.config.interval);
        self.run_with_ticker(ticker, shutdown).await;
    }

    /// Start the loop on an arbitrary ticker. Runs until `shutdown` fires;
    /// a tick already in progress is finished first.
    pub async fn run_with_ticker<T: Ticker>(
        mut self,
        mut ticker: T,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        info!(
            interval_ms = self.config.interval.as_millis() as u64,
            nodes = self.config.nodes.len(),
            namespace = %self.config.namespace,
            "Starting sampling loop"
        );

        if let Some(metrics) = &self.metrics {
            metrics.set_nodes_configured(self.config.nodes.len() as i64);
        }

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let report = self.run_tick().await;
                    self.record(&report).await;
                }
                _ = shutdown.recv() => {
                    info!(ticks = self.tick_count, "Shutting down sampling loop");
                    break;
                }
            }
        }

        if let Some(health) = &self.health {
            health.record_stopped("sampling loop stopped").await;
        }
    }

    /// Run one full tick across all configured nodes
    pub async fn run_tick(&mut self) -> TickReport {
        self.state_tx.send_replace(SchedulerState::Running);
        self.tick_count += 1;
        let start = Instant::now();

        let mut report = TickReport {
            tick: self.tick_count,
            ..Default::default()
        };

        let fetches = fetch_nodes(
            Arc::clone(&self.source),
            &self.config.nodes,
            self.config.strategy,
        );
        futures_util::pin_mut!(fetches);

        while let Some(fetch) = fetches.next().await {
            self.process_node(fetch, &mut report).await;
        }

        report.elapsed = start.elapsed();
        self.state_tx.send_replace(SchedulerState::Idle);
        report
    }

    /// Filter, normalize and write one node's pods
    async fn process_node(&self, fetch: NodeFetch, report: &mut TickReport) {
        let summary = match fetch.result {
            Ok(summary) => summary,
            Err(error) => {
                report.node_failures.push(NodeFailure {
                    node: fetch.node,
                    error,
                });
                return;
            }
        };
        report.nodes_fetched += 1;

        for pod in self.filter.select(&summary) {
            report.pods_matched += 1;

            for container in &pod.containers {
                let sample = normalize(container);
                match self.writer.write(pod.name(), &container.name, &sample).await {
                    Ok(entry) => report.written.push(entry),
                    Err(error) => report.write_failures.push(WriteFailure {
                        key: StoreKey::new(pod.name(), &container.name),
                        error,
                    }),
                }
            }
        }
    }

    /// Log, count and publish health for a finished tick
    async fn record(&self, report: &TickReport) {
        for failure in &report.node_failures {
            self.logger.log_node_error(&failure.node, &failure.error);
        }
        for entry in &report.written {
            self.logger.log_sample_written(entry);
        }
        for failure in &report.write_failures {
            self.logger.log_write_error(&failure.key, &failure.error);
        }

        self.logger.log_tick(report);
        if report.elapsed > self.config.interval {
            self.logger.log_tick_overrun(report.tick, report.elapsed, self.config.interval);
        }

        if let Some(metrics) = &self.metrics {
            metrics.observe_tick_latency(report.elapsed.as_secs_f64());
            metrics.inc_ticks();
            for failure in &report.node_failures {
                metrics.inc_node_errors(failure.error.stage());
            }
            metrics.inc_write_errors_by(report.write_failures.len() as u64);
            metrics.inc_samples_written_by(report.written.len() as u64);
            metrics.set_pods_matched(report.pods_matched as i64);
        }

        if let Some(health) = &self.health {
            health
                .record_tick(
                    report.node_failures.len(),
                    report.nodes_attempted(),
                    report.write_failures.len(),
                    report.samples_attempted(),
                )
                .await;
        }
    }
}

/// Builder for creating the sampling loop
pub struct SamplingLoopBuilder {
    source: Option<Arc<dyn SummarySource>>,
    store: Option<Arc<dyn SampleStore>>,
    clock: Arc<dyn Clock>,
    config: SamplingConfig,
    health: Option<HealthRegistry>,
    metrics: Option<SamplerMetrics>,
}

impl SamplingLoopBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            source: None,
            store: None,
            clock: Arc::new(SystemClock),
            config: SamplingConfig::default(),
            health: None,
            metrics: None,
        }
    }

    /// Set the summary source
    pub fn source(mut self, source: Arc<dyn SummarySource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Set the sample store
    pub fn store(mut self, store: Arc<dyn SampleStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the clock used for entry timestamps
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Set the nodes polled on every tick
    pub fn nodes(mut self, nodes: Vec<String>) -> Self {
        self.config.nodes = nodes;
        self
    }

    /// Set the namespace filter
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.config.namespace = namespace.into();
        self
    }

    /// Set the tick interval
    pub fn interval(mut self, interval: Duration) -> Self {
        self.config.interval = interval;
        self
    }

    /// Set the node fetch strategy
    pub fn strategy(mut self, strategy: FetchStrategy) -> Self {
        self.config.strategy = strategy;
        self
    }

    /// Report component health after each tick
    pub fn health(mut self, health: HealthRegistry) -> Self {
        self.health = Some(health);
        self
    }

    /// Record Prometheus metrics after each tick
    pub fn metrics(mut self, metrics: SamplerMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Build the sampling loop
    pub fn build(self) -> Result<SamplingLoop> {
        let source = self
            .source
            .ok_or_else(|| anyhow::anyhow!("Summary source is required"))?;
        let store = self
            .store
            .ok_or_else(|| anyhow::anyhow!("Sample store is required"))?;
        if self.config.nodes.is_empty() {
            anyhow::bail!("At least one node is required");
        }
        if self.config.interval.is_zero() {
            anyhow::bail!("Poll interval must be greater than zero");
        }

        let mut sampling_loop = SamplingLoop::new(source, store, self.clock, self.config);
        sampling_loop.health = self.health;
        sampling_loop.metrics = self.metrics;
        Ok(sampling_loop)
    }
}

impl Default for SamplingLoopBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::decode_summary;
    use crate::error::{FetchError, WriteError};
    use crate::health::{components, ComponentStatus};
    use crate::models::NodeSummary;
    use crate::store::MemoryStore;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicI64, Ordering};

    /// Serves canned payloads; nodes without one fail at the transport
    struct StaticSource {
        payloads: HashMap<String, String>,
    }

    impl StaticSource {
        fn new(payloads: &[(&str, &str)]) -> Self {
            Self {
                payloads: payloads
                    .iter()
                    .map(|(node, body)| (node.to_string(), body.to_string()))
                    .collect(),
            }
        }
    }

    #[async_trait]
    impl SummarySource for StaticSource {
        async fn fetch(&self, node: &str) -> Result<NodeSummary, SampleError> {
            match self.payloads.get(node) {
                Some(body) => Ok(decode_summary(body.as_bytes())?),
                None => Err(FetchError::Transport("connection refused".to_string()).into()),
            }
        }
    }

    /// Serves canned payloads after a per-node delay
    struct DelayedSource {
        payloads: HashMap<String, (Duration, String)>,
    }

    impl DelayedSource {
        fn new(payloads: &[(&str, u64, String)]) -> Self {
            Self {
                payloads: payloads
                    .iter()
                    .map(|(node, delay_ms, body)| {
                        (node.to_string(), (Duration::from_millis(*delay_ms), body.clone()))
                    })
                    .collect(),
            }
        }
    }

    #[async_trait]
    impl SummarySource for DelayedSource {
        async fn fetch(&self, node: &str) -> Result<NodeSummary, SampleError> {
            let (delay, body) = self
                .payloads
                .get(node)
                .ok_or_else(|| FetchError::Transport("connection refused".to_string()))?;
            if !delay.is_zero() {
                tokio::time::sleep(*delay).await;
            }
            Ok(decode_summary(body.as_bytes())?)
        }
    }

    /// Milliseconds since the clock was created, on tokio's clock
    struct ElapsedClock(Instant);

    impl Clock for ElapsedClock {
        fn now_millis(&self) -> i64 {
            self.0.elapsed().as_millis() as i64
        }
    }

    /// Rejects writes for one container name
    struct PickyStore {
        inner: MemoryStore,
        reject_container: &'static str,
    }

    #[async_trait]
    impl SampleStore for PickyStore {
        async fn append(&self, key: &StoreKey, score: i64, member: &str) -> Result<(), WriteError> {
            if key.parts().map(|(_, c)| c) == Some(self.reject_container) {
                return Err(WriteError::Unavailable("connection reset".to_string()));
            }
            self.inner.append(key, score, member).await
        }

        async fn keys(&self, pattern: &str) -> Result<Vec<StoreKey>> {
            self.inner.keys(pattern).await
        }

        async fn range(&self, key: &StoreKey) -> Result<Vec<(String, i64)>> {
            self.inner.range(key).await
        }
    }

    struct SteppingClock(AtomicI64);

    impl Clock for SteppingClock {
        fn now_millis(&self) -> i64 {
            self.0.fetch_add(100, Ordering::SeqCst)
        }
    }

    /// Yields `remaining` ticks, then signals shutdown and never ticks again
    struct CountedTicker {
        remaining: usize,
        shutdown: broadcast::Sender<()>,
    }

    #[async_trait]
    impl Ticker for CountedTicker {
        async fn tick(&mut self) {
            if self.remaining == 0 {
                let _ = self.shutdown.send(());
                std::future::pending::<()>().await;
            }
            self.remaining -= 1;
        }
    }

    fn pod_json(name: &str, namespace: &str, containers: &[&str]) -> String {
        let containers: Vec<String> = containers
            .iter()
            .map(|c| {
                format!(
                    r#"{{"name": "{}", "cpu": {{"usageNanoCores": 250000000}},
                        "memory": {{"usageBytes": 2048}}}}"#,
                    c
                )
            })
            .collect();
        format!(
            r#"{{"podRef": {{"name": "{}", "namespace": "{}"}}, "containers": [{}]}}"#,
            name,
            namespace,
            containers.join(",")
        )
    }

    fn summary_json(pods: &[String]) -> String {
        format!(r#"{{"pods": [{}]}}"#, pods.join(","))
    }

    fn nodes(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_sampling_config_default() {
        let config = SamplingConfig::default();
        assert_eq!(config.interval, Duration::from_millis(100));
        assert_eq!(config.namespace, "default");
        assert_eq!(config.strategy, FetchStrategy::Sequential);
        assert!(config.nodes.is_empty());
    }

    #[test]
    fn test_builder_rejects_incomplete_or_zero_interval() {
        let store: Arc<dyn SampleStore> = Arc::new(MemoryStore::new());
        let source: Arc<dyn SummarySource> = Arc::new(StaticSource::new(&[]));

        assert!(SamplingLoopBuilder::new()
            .store(store.clone())
            .nodes(nodes(&["n1"]))
            .build()
            .is_err());
        assert!(SamplingLoopBuilder::new()
            .source(source.clone())
            .nodes(nodes(&["n1"]))
            .build()
            .is_err());
        assert!(SamplingLoopBuilder::new()
            .source(source.clone())
            .store(store.clone())
            .build()
            .is_err());
        assert!(SamplingLoopBuilder::new()
            .source(source.clone())
            .store(store.clone())
            .nodes(nodes(&["n1"]))
            .interval(Duration::ZERO)
            .build()
            .is_err());
        assert!(SamplingLoopBuilder::new()
            .source(source)
            .store(store)
            .nodes(nodes(&["n1"]))
            .interval(Duration::from_millis(250))
            .build()
            .is_ok());
    }

    #[tokio::test]
    async fn test_failing_node_does_not_block_others() {
        let body = summary_json(&[pod_json("p2", "default", &["c2"])]);
        let source = Arc::new(StaticSource::new(&[("n2", body.as_str()), ("n4", "not json")]));
        let store = Arc::new(MemoryStore::new());
        let health = HealthRegistry::new();

        let mut sampling_loop = SamplingLoopBuilder::new()
            .source(source)
            .store(store.clone())
            .nodes(nodes(&["n1", "n2", "n4"]))
            .health(health.clone())
            .build()
            .unwrap();

        let report = sampling_loop.run_tick().await;
        sampling_loop.record(&report).await;

        assert_eq!(report.nodes_fetched, 1);
        assert_eq!(report.node_failures.len(), 2);
        assert_eq!(report.node_failures[0].node, "n1");
        assert_eq!(report.node_failures[0].error.stage(), "fetch");
        assert_eq!(report.node_failures[1].node, "n4");
        assert_eq!(report.node_failures[1].error.stage(), "decode");
        assert_eq!(store.len(), 1);
        assert_eq!(store.appended()[0].key.as_str(), "util:p2:c2");

        let status = health.health().await;
        assert_eq!(
            status.components[components::FETCHER].status,
            ComponentStatus::Degraded
        );
    }

    #[tokio::test]
    async fn test_all_nodes_failing_only_degrades_fetcher() {
        let store = Arc::new(MemoryStore::new());
        let health = HealthRegistry::new();

        let mut sampling_loop = SamplingLoopBuilder::new()
            .source(Arc::new(StaticSource::new(&[])))
            .store(store.clone())
            .nodes(nodes(&["n1", "n2"]))
            .health(health.clone())
            .build()
            .unwrap();

        let report = sampling_loop.run_tick().await;
        sampling_loop.record(&report).await;

        assert!(store.is_empty());
        let status = health.health().await;
        assert_eq!(
            status.components[components::FETCHER].status,
            ComponentStatus::Degraded
        );
        assert_eq!(status.status, ComponentStatus::Degraded);
    }

    #[tokio::test]
    async fn test_write_failure_drops_only_that_container() {
        let body = summary_json(&[
            pod_json("p1", "default", &["app", "sidecar"]),
            pod_json("p2", "default", &["app"]),
        ]);
        let store = Arc::new(PickyStore {
            inner: MemoryStore::new(),
            reject_container: "sidecar",
        });
        let health = HealthRegistry::new();

        let mut sampling_loop = SamplingLoopBuilder::new()
            .source(Arc::new(StaticSource::new(&[("n1", body.as_str())])))
            .store(store.clone())
            .nodes(nodes(&["n1"]))
            .health(health.clone())
            .build()
            .unwrap();

        let report = sampling_loop.run_tick().await;
        sampling_loop.record(&report).await;

        assert_eq!(report.pods_matched, 2);
        assert_eq!(report.written.len(), 2);
        assert_eq!(report.write_failures.len(), 1);
        assert_eq!(report.write_failures[0].key.as_str(), "util:p1:sidecar");
        let written: Vec<&str> = report.written.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(written, vec!["util:p1:app", "util:p2:app"]);

        let status = health.health().await;
        assert_eq!(
            status.components[components::STORE].status,
            ComponentStatus::Degraded
        );
    }

    #[tokio::test]
    async fn test_other_namespaces_produce_no_writes() {
        let body = summary_json(&[pod_json("dns", "kube-system", &["coredns"])]);
        let store = Arc::new(MemoryStore::new());

        let mut sampling_loop = SamplingLoopBuilder::new()
            .source(Arc::new(StaticSource::new(&[("n1", body.as_str())])))
            .store(store.clone())
            .nodes(nodes(&["n1"]))
            .build()
            .unwrap();

        let report = sampling_loop.run_tick().await;
        assert_eq!(report.nodes_fetched, 1);
        assert_eq!(report.pods_matched, 0);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_state_returns_to_idle_after_tick() {
        let mut sampling_loop = SamplingLoopBuilder::new()
            .source(Arc::new(StaticSource::new(&[])))
            .store(Arc::new(MemoryStore::new()))
            .nodes(nodes(&["n1"]))
            .build()
            .unwrap();
        let state = sampling_loop.subscribe_state();

        assert_eq!(*state.borrow(), SchedulerState::Idle);
        sampling_loop.run_tick().await;
        assert_eq!(*state.borrow(), SchedulerState::Idle);
    }

    #[tokio::test]
    async fn test_run_processes_each_tick_in_order() {
        let body = summary_json(&[pod_json("p1", "default", &["c1", "c2"])]);
        let store = Arc::new(MemoryStore::new());
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let sampling_loop = SamplingLoopBuilder::new()
            .source(Arc::new(StaticSource::new(&[("n1", body.as_str())])))
            .store(store.clone())
            .clock(Arc::new(SteppingClock(AtomicI64::new(1_000))))
            .nodes(nodes(&["n1"]))
            .build()
            .unwrap();

        let ticker = CountedTicker {
            remaining: 3,
            shutdown: shutdown_tx,
        };
        sampling_loop.run_with_ticker(ticker, shutdown_rx).await;

        assert_eq!(store.len(), 6);
        for container in ["c1", "c2"] {
            let entries = store.entries(&StoreKey::new("p1", container));
            assert_eq!(entries.len(), 3);
            let scores: Vec<i64> = entries.iter().map(|(_, score)| *score).collect();
            assert!(scores.windows(2).all(|w| w[0] <= w[1]), "{:?}", scores);
        }
    }

    /// Run one tick and return each written key with its score, in write order
    async fn write_times(
        nodes_and_delays: &[(&str, u64)],
        strategy: FetchStrategy,
    ) -> Vec<(String, i64)> {
        let payloads: Vec<(&str, u64, String)> = nodes_and_delays
            .iter()
            .map(|(node, delay)| {
                let pod = format!("pod-{}", node);
                (*node, *delay, summary_json(&[pod_json(&pod, "default", &["app"])]))
            })
            .collect();
        let store = Arc::new(MemoryStore::new());

        let mut sampling_loop = SamplingLoopBuilder::new()
            .source(Arc::new(DelayedSource::new(&payloads)))
            .store(store.clone())
            .clock(Arc::new(ElapsedClock(Instant::now())))
            .nodes(nodes_and_delays.iter().map(|(n, _)| n.to_string()).collect())
            .strategy(strategy)
            .build()
            .unwrap();
        sampling_loop.run_tick().await;

        store
            .appended()
            .iter()
            .map(|e| (e.key.as_str().to_string(), e.timestamp_ms))
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_node_is_written_before_later_nodes_are_fetched() {
        for strategy in [FetchStrategy::Sequential, FetchStrategy::Bounded(2)] {
            let written = write_times(&[("n1", 0), ("n2", 600)], strategy).await;
            let keys: Vec<&str> = written.iter().map(|(k, _)| k.as_str()).collect();
            assert_eq!(keys, vec!["util:pod-n1:app", "util:pod-n2:app"]);
            assert!(written[0].1 < 5, "{:?}: {:?}", strategy, written);
            assert!(written[1].1 >= 600, "{:?}: {:?}", strategy, written);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_node_delays_only_nodes_after_it() {
        let written = write_times(&[("n1", 600), ("n2", 0)], FetchStrategy::Bounded(2)).await;
        let keys: Vec<&str> = written.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["util:pod-n1:app", "util:pod-n2:app"]);
        assert!(written.iter().all(|(_, ts)| *ts >= 600), "{:?}", written);
        assert!(written[1].1 < 1_000, "{:?}", written);
    }

    #[tokio::test]
    async fn test_spawned_loop_runs_until_shutdown() {
        let body = summary_json(&[pod_json("p1", "default", &["c1"])]);
        let store = Arc::new(MemoryStore::new());
        let health = HealthRegistry::new();
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let sampling_loop = SamplingLoopBuilder::new()
            .source(Arc::new(StaticSource::new(&[("n1", body.as_str())])))
            .store(store.clone())
            .nodes(nodes(&["n1", "n2"]))
            .interval(Duration::from_millis(10))
            .strategy(FetchStrategy::Bounded(2))
            .health(health.clone())
            .build()
            .unwrap();

        let handle = tokio::spawn(sampling_loop.run(shutdown_rx));

        tokio::time::timeout(Duration::from_secs(5), async {
            while store.len() < 2 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        shutdown_tx.send(()).unwrap();
        handle.await.unwrap();

        let status = health.health().await;
        assert_eq!(status.status, ComponentStatus::Unhealthy);
        assert_eq!(
            status.components[components::SCHEDULER].message.as_deref(),
            Some("sampling loop stopped")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_ticker_delays_after_overrun() {
        let mut ticker = IntervalTicker::new(Duration::from_millis(100));
        let start = Instant::now();

        ticker.tick().await;
        assert_eq!(start.elapsed(), Duration::ZERO);

        // Simulate a tick that ran 250ms
        tokio::time::advance(Duration::from_millis(250)).await;
        ticker.tick().await;
        let resumed = Instant::now();
        assert_eq!(resumed - start, Duration::from_millis(250));

        // No burst: the following boundary is a full period later
        ticker.tick().await;
        assert_eq!(Instant::now() - resumed, Duration::from_millis(100));
    }
}
