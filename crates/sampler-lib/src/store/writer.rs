//! Sample write-out

use super::SampleStore;
use crate::error::SampleError;
use crate::models::{NormalizedSample, StoreEntry, StoreKey};
use std::sync::Arc;

/// Wall-clock source for entry timestamps
pub trait Clock: Send + Sync {
    /// Milliseconds since the Unix epoch
    fn now_millis(&self) -> i64;
}

/// Clock backed by the system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Formats normalized samples and appends them to the store
#[derive(Clone)]
pub struct SampleWriter {
    store: Arc<dyn SampleStore>,
    clock: Arc<dyn Clock>,
}

impl SampleWriter {
    pub fn new(store: Arc<dyn SampleStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Append one sample under `util:<pod>:<container>`, scored by the
    /// current time. On failure nothing is written for this container.
    pub async fn write(
        &self,
        pod_name: &str,
        container_name: &str,
        sample: &NormalizedSample,
    ) -> Result<StoreEntry, SampleError> {
        let key = StoreKey::new(pod_name, container_name);
        let member = sample.to_member();
        let timestamp_ms = self.clock.now_millis();

        self.store.append(&key, timestamp_ms, &member).await?;

        Ok(StoreEntry {
            key,
            timestamp_ms,
            member,
        })
    }
}
