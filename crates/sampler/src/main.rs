//! Utilization Sampler - per-container utilization time series
//!
//! Polls the kubelet summary of each configured node through the API
//! server proxy and appends normalized container samples to Redis.

use anyhow::Result;
use sampler_lib::{
    collector::{KubeletSummaryClient, SamplingLoopBuilder},
    health::{components, HealthRegistry},
    observability::{SamplerMetrics, StructuredLogger},
    store::{MemoryStore, RedisStore, SampleStore},
};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use util_sampler::{
    api,
    config::{SamplerConfig, StoreBackend},
};

const SAMPLER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting util-sampler");

    let config = SamplerConfig::load()?;
    let nodes = config.nodes();

    let logger = StructuredLogger::new(&config.namespace_filter);
    logger.log_startup(SAMPLER_VERSION, &nodes, config.poll_interval());

    let health_registry = HealthRegistry::new();
    health_registry.register(components::FETCHER).await;
    health_registry.register(components::STORE).await;
    health_registry.register(components::SCHEDULER).await;

    let metrics = SamplerMetrics::new();

    // An unreachable store at startup is fatal; later outages only fail writes
    let store: Arc<dyn SampleStore> = match config.store_backend {
        StoreBackend::Redis => {
            let store = RedisStore::connect(&config.redis()).await?;
            store.ping().await?;
            Arc::new(store)
        }
        StoreBackend::Memory => {
            warn!("Using in-memory store, samples are not persisted");
            Arc::new(MemoryStore::new())
        }
    };

    let source = Arc::new(KubeletSummaryClient::new(
        &config.kubelet_host,
        config.kubelet_port,
        config.fetch_timeout(),
    )?);
    info!(
        kubelet = %format!("{}:{}", config.kubelet_host, config.kubelet_port),
        timeout_ms = config.fetch_timeout_ms,
        "Summary client configured"
    );

    let sampling_loop = SamplingLoopBuilder::new()
        .source(source)
        .store(store)
        .nodes(nodes)
        .namespace(config.namespace_filter.clone())
        .interval(config.poll_interval())
        .strategy(config.strategy())
        .health(health_registry.clone())
        .metrics(metrics.clone())
        .build()?;

    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    let app_state = Arc::new(api::AppState::new(health_registry.clone(), metrics));
    let api_handle = tokio::spawn(api::serve(
        config.api_port,
        app_state,
        shutdown_tx.subscribe(),
    ));

    let loop_handle = tokio::spawn(sampling_loop.run(shutdown_tx.subscribe()));
    health_registry.set_ready(true).await;

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    logger.log_shutdown("SIGINT received");
    health_registry.set_ready(false).await;
    let _ = shutdown_tx.send(());

    if let Err(e) = loop_handle.await {
        error!(error = %e, "Sampling loop task failed");
    }
    match api_handle.await {
        Ok(Err(e)) => error!(error = %e, "API server failed"),
        Err(e) => error!(error = %e, "API server task failed"),
        Ok(Ok(())) => {}
    }

    info!("Shutdown complete");
    Ok(())
}
