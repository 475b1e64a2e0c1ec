//! Health check infrastructure for the sampler
//!
//! Tracks the fetcher, store and scheduler so liveness and readiness checks
//! can tell a sampler that is writing samples from one that is only spinning.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Health status of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    /// Last tick went through cleanly
    Healthy,
    /// Some or all nodes or writes failed last tick
    Degraded,
    /// The component cannot recover on its own, e.g. a stopped scheduler
    Unhealthy,
}

/// Information about a component's health
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

impl ComponentHealth {
    fn with_status(status: ComponentStatus, message: Option<String>) -> Self {
        Self {
            status,
            message,
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn healthy() -> Self {
        Self::with_status(ComponentStatus::Healthy, None)
    }

    pub fn degraded(message: impl Into<String>) -> Self {
        Self::with_status(ComponentStatus::Degraded, Some(message.into()))
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self::with_status(ComponentStatus::Unhealthy, Some(message.into()))
    }

    /// Grade a stage by how many of its attempts failed
    pub fn from_failures(what: &str, failed: usize, attempted: usize) -> Self {
        if failed == 0 {
            Self::healthy()
        } else if failed >= attempted {
            Self::unhealthy(format!("all {} {} failed", failed, what))
        } else {
            Self::degraded(format!("{} of {} {} failed", failed, attempted, what))
        }
    }

    /// Report a total failure as degraded; the next tick retries it
    fn capped(self) -> Self {
        match self.status {
            ComponentStatus::Unhealthy => Self {
                status: ComponentStatus::Degraded,
                ..self
            },
            _ => self,
        }
    }
}

/// Overall health response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: HashMap<String, ComponentHealth>,
}

impl HealthResponse {
    /// Worst status across all components
    pub fn compute_status(components: &HashMap<String, ComponentHealth>) -> ComponentStatus {
        let mut status = ComponentStatus::Healthy;
        for health in components.values() {
            match health.status {
                ComponentStatus::Unhealthy => return ComponentStatus::Unhealthy,
                ComponentStatus::Degraded => status = ComponentStatus::Degraded,
                ComponentStatus::Healthy => {}
            }
        }
        status
    }
}

/// Readiness response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Component names for health tracking
pub mod components {
    pub const FETCHER: &str = "fetcher";
    pub const STORE: &str = "store";
    pub const SCHEDULER: &str = "scheduler";
}

/// Health registry for tracking component health
#[derive(Debug, Clone)]
pub struct HealthRegistry {
    components: Arc<RwLock<HashMap<String, ComponentHealth>>>,
    ready: Arc<RwLock<bool>>,
}

impl Default for HealthRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self {
            components: Arc::new(RwLock::new(HashMap::new())),
            ready: Arc::new(RwLock::new(false)),
        }
    }

    /// Register a component with initial healthy status
    pub async fn register(&self, name: &str) {
        self.update(name, ComponentHealth::healthy()).await;
    }

    /// Update component health status
    pub async fn update(&self, name: &str, health: ComponentHealth) {
        self.components
            .write()
            .await
            .insert(name.to_string(), health);
    }

    pub async fn set_healthy(&self, name: &str) {
        self.update(name, ComponentHealth::healthy()).await;
    }

    pub async fn set_unhealthy(&self, name: &str, message: impl Into<String>) {
        self.update(name, ComponentHealth::unhealthy(message)).await;
    }

    /// Grade fetcher and store from one tick's outcome.
    ///
    /// Node and write failures only ever degrade their component, even when
    /// every attempt failed: the next tick retries all of them. Only a
    /// stopped scheduler makes the sampler unhealthy.
    pub async fn record_tick(
        &self,
        failed_nodes: usize,
        attempted_nodes: usize,
        failed_writes: usize,
        attempted_writes: usize,
    ) {
        let fetcher = ComponentHealth::from_failures("nodes", failed_nodes, attempted_nodes);
        self.update(components::FETCHER, fetcher.capped()).await;

        let store = ComponentHealth::from_failures("writes", failed_writes, attempted_writes);
        self.update(components::STORE, store.capped()).await;

        self.set_healthy(components::SCHEDULER).await;
    }

    /// The sampling loop has exited and no further ticks will run
    pub async fn record_stopped(&self, reason: impl Into<String>) {
        self.set_unhealthy(components::SCHEDULER, reason).await;
    }

    /// Set readiness status
    pub async fn set_ready(&self, ready: bool) {
        *self.ready.write().await = ready;
    }

    /// Get health response
    pub async fn health(&self) -> HealthResponse {
        let components = self.components.read().await.clone();
        let status = HealthResponse::compute_status(&components);
        HealthResponse { status, components }
    }

    /// Get readiness response
    pub async fn readiness(&self) -> ReadinessResponse {
        let ready = *self.ready.read().await;

        let reason = if !ready {
            Some("Sampler not yet started".to_string())
        } else if self.health().await.status == ComponentStatus::Unhealthy {
            Some("Critical component unhealthy".to_string())
        } else {
            None
        };

        ReadinessResponse {
            ready: reason.is_none(),
            reason,
        }
    }
}
