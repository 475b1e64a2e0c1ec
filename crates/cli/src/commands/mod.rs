//! CLI command implementations

pub mod samples;
