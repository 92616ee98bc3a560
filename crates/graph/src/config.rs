use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Entity graph options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Number of independently locked partitions
    pub partitions: usize,
    /// Capacity of the recently-seen event id set used for idempotence
    pub seen_capacity: usize,
    /// Orders, edges and nodes untouched for this long are evictable
    pub retention_ms: i64,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            partitions: 16,
            seen_capacity: 100_000,
            retention_ms: 300_000,
        }
    }
}

impl GraphConfig {
    pub fn retention(&self) -> Duration {
        Duration::milliseconds(self.retention_ms)
    }
}
