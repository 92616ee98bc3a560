use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Window manager options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Events older than this behind "now" are expired
    pub retention_ms: i64,
    /// Hard cap per window; the oldest events are dropped beyond it
    pub max_events_per_window: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            retention_ms: 60_000,
            max_events_per_window: 10_000,
        }
    }
}

impl WindowConfig {
    pub fn retention(&self) -> Duration {
        Duration::milliseconds(self.retention_ms)
    }
}
