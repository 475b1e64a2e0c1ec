//! Utilization sampler service
//!
//! Configuration and the health/metrics HTTP surface for the
//! `util-sampler` binary.

pub mod api;
pub mod config;
