use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Normalizer options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// How far behind a feed's watermark an event may be and still be accepted
    pub skew_tolerance_ms: i64,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            skew_tolerance_ms: 500,
        }
    }
}

impl NormalizerConfig {
    pub fn skew_tolerance(&self) -> Duration {
        Duration::milliseconds(self.skew_tolerance_ms.max(0))
    }
}
