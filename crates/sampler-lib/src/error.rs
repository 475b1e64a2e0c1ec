//! Error taxonomy for the sampling pipeline
//!
//! Every error here is local to one node or one container. The scheduler
//! logs them and moves on; none of them stops a tick.

use std::time::Duration;
use thiserror::Error;

/// Failure to obtain a summary payload from a node
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid summary url for node {node}: {reason}")]
    InvalidUrl { node: String, reason: String },

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },
}

/// Failure to turn a payload into a [`crate::models::NodeSummary`]
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("payload is not valid JSON: {0}")]
    Malformed(String),

    #[error("payload has no `pods` collection")]
    MissingPods,

    #[error("payload does not match the summary schema: {0}")]
    Schema(String),
}

/// Failure to append a sample to the store
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store rejected write: {0}")]
    Rejected(String),
}

/// Any pipeline error, tagged with the stage that produced it
#[derive(Debug, Error)]
pub enum SampleError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("decode failed: {0}")]
    Decode(#[from] DecodeError),

    #[error("write failed: {0}")]
    Write(#[from] WriteError),
}

impl SampleError {
    /// Short stage label used in logs and metrics
    pub fn stage(&self) -> &'static str {
        match self {
            SampleError::Fetch(_) => "fetch",
            SampleError::Decode(_) => "decode",
            SampleError::Write(_) => "write",
        }
    }
}

impl From<redis::RedisError> for WriteError {
    fn from(e: redis::RedisError) -> Self {
        if e.is_io_error()
            || e.is_connection_dropped()
            || e.is_connection_refusal()
            || e.is_timeout()
        {
            WriteError::Unavailable(e.to_string())
        } else {
            WriteError::Rejected(e.to_string())
        }
    }
}
