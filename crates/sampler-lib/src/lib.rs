//! Sampler library for per-container utilization
//!
//! This crate provides the core functionality for:
//! - Fetching and decoding kubelet `stats/summary` documents per node
//! - Namespace filtering and unit normalization
//! - Appending samples to a time-ordered store (Redis or in-memory)
//! - Exporting stored samples back out
//! - Health checks and observability

pub mod collector;
pub mod error;
pub mod export;
pub mod health;
pub mod models;
pub mod observability;
pub mod store;

pub use error::{DecodeError, FetchError, SampleError, WriteError};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{SamplerMetrics, StructuredLogger};
