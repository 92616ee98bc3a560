//! Engine configuration
//!
//! One JSON document with a section per component. Every field has a default;
//! the defaults are starting points for tuning, not recommended thresholds.
//!
//! ```json
//! {
//!   "window": { "retention_ms": 120000 },
//!   "detectors": { "spoofing": { "min_confidence": 0.5 } },
//!   "pipeline": { "workers": 8, "queue_depth": 50000 }
//! }
//! ```

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use sentinel_alerts::AlertsConfig;
use sentinel_detectors::DetectorsConfig;
use sentinel_graph::GraphConfig;
use sentinel_normalizer::NormalizerConfig;
use sentinel_window::WindowConfig;

/// Root configuration for the surveillance engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub normalizer: NormalizerConfig,
    pub graph: GraphConfig,
    pub window: WindowConfig,
    pub detectors: DetectorsConfig,
    pub alerts: AlertsConfig,
    pub pipeline: PipelineConfig,
}

impl EngineConfig {
    /// Load and validate configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            error: e.to_string(),
        })?;

        Self::from_json(&content)
    }

    /// Parse and validate configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut problems = Vec::new();

        if self.graph.partitions == 0 {
            problems.push("graph.partitions must be positive".to_string());
        }
        if self.graph.retention_ms <= 0 {
            problems.push("graph.retention_ms must be positive".to_string());
        }
        if self.window.retention_ms <= 0 {
            problems.push("window.retention_ms must be positive".to_string());
        }
        if self.window.max_events_per_window == 0 {
            problems.push("window.max_events_per_window must be positive".to_string());
        }
        if self.normalizer.skew_tolerance_ms < 0 {
            problems.push("normalizer.skew_tolerance_ms must be non-negative".to_string());
        }
        // A detector cannot look further back than windows keep events
        let lookback = self.detectors.max_lookback();
        if self.window.retention() < lookback {
            problems.push(format!(
                "window.retention_ms ({}) is shorter than the longest detector lookback ({})",
                self.window.retention_ms,
                lookback.num_milliseconds()
            ));
        }
        problems.extend(self.detectors.problems());
        problems.extend(self.alerts.problems());
        problems.extend(self.pipeline.problems());

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(problems))
        }
    }
}

/// Worker pool, queue and sweep settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub workers: usize,
    /// Events accepted but not yet processed, across all workers
    pub queue_depth: usize,
    pub sweep_interval_ms: i64,
    /// Sweep at the newest event time rather than the clock (replays)
    pub sweep_uses_event_time: bool,
    pub retry: RetryConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            queue_depth: 10_000,
            sweep_interval_ms: 1_000,
            sweep_uses_event_time: false,
            retry: RetryConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn sweep_interval(&self) -> Duration {
        Duration::milliseconds(self.sweep_interval_ms)
    }

    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.workers == 0 {
            problems.push("pipeline.workers must be positive".to_string());
        }
        if self.queue_depth == 0 {
            problems.push("pipeline.queue_depth must be positive".to_string());
        }
        if self.sweep_interval_ms <= 0 {
            problems.push("pipeline.sweep_interval_ms must be positive".to_string());
        }
        problems.extend(self.retry.problems());
        problems
    }
}

/// Bounded exponential backoff for alert delivery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff_ms: 10,
            max_backoff_ms: 1_000,
        }
    }
}

impl RetryConfig {
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.max_attempts == 0 {
            problems.push("pipeline.retry.max_attempts must be at least 1".to_string());
        }
        if self.max_backoff_ms < self.initial_backoff_ms {
            problems.push(
                "pipeline.retry.max_backoff_ms must not be below initial_backoff_ms".to_string(),
            );
        }
        problems
    }
}

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {error}")]
    Io { path: String, error: String },

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid config: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert_eq!(EngineConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config = EngineConfig::from_json(
            r#"{
                "window": { "retention_ms": 120000 },
                "detectors": { "spoofing": { "min_confidence": 0.5 } },
                "pipeline": { "workers": 8, "retry": { "max_attempts": 2 } }
            }"#,
        )
        .unwrap();

        assert_eq!(config.window.retention_ms, 120_000);
        assert_eq!(config.detectors.spoofing.min_confidence, 0.5);
        assert_eq!(config.pipeline.workers, 8);
        assert_eq!(config.pipeline.retry.max_attempts, 2);
        assert_eq!(config.pipeline.queue_depth, 10_000);
        assert_eq!(config.graph, GraphConfig::default());
    }

    #[test]
    fn test_validation_collects_every_problem() {
        let err = EngineConfig::from_json(
            r#"{ "pipeline": { "workers": 0, "queue_depth": 0 }, "graph": { "partitions": 0 } }"#,
        )
        .unwrap_err();

        let ConfigError::Invalid(problems) = err else {
            panic!("expected validation error");
        };
        assert_eq!(problems.len(), 3, "{problems:?}");
    }

    #[test]
    fn test_window_must_cover_detector_lookback() {
        let mut config = EngineConfig::default();
        config.window.retention_ms = 1_000;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            EngineConfig::from_json("{ not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            EngineConfig::from_file("/nonexistent/sentinel.json"),
            Err(ConfigError::Io { .. })
        ));
    }
}
