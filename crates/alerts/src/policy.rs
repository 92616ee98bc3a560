//! Severity and merge policies
//!
//! Defaults are deployment policy. Tune them per organisation.

use serde::{Deserialize, Serialize};
use sentinel_core::AlertSeverity;

/// Severity score = `confidence_weight * max_confidence
///                 + count_weight * min(evidence_count / count_saturation, 1)`
///
/// Non-decreasing in both inputs, so merging more evidence never lowers it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeverityPolicy {
    pub confidence_weight: f64,
    pub count_weight: f64,
    /// Evidence count at which the count component stops growing
    pub count_saturation: usize,
    pub medium_at: f64,
    pub high_at: f64,
    pub critical_at: f64,
}

impl Default for SeverityPolicy {
    fn default() -> Self {
        Self {
            confidence_weight: 0.7,
            count_weight: 0.3,
            count_saturation: 5,
            medium_at: 0.4,
            high_at: 0.6,
            critical_at: 0.8,
        }
    }
}

impl SeverityPolicy {
    pub fn score(&self, evidence_count: usize, max_confidence: f64) -> f64 {
        let count = if self.count_saturation == 0 {
            1.0
        } else {
            (evidence_count as f64 / self.count_saturation as f64).min(1.0)
        };
        (self.confidence_weight * max_confidence.clamp(0.0, 1.0) + self.count_weight * count)
            .clamp(0.0, 1.0)
    }

    pub fn level(&self, score: f64) -> AlertSeverity {
        if score >= self.critical_at {
            AlertSeverity::Critical
        } else if score >= self.high_at {
            AlertSeverity::High
        } else if score >= self.medium_at {
            AlertSeverity::Medium
        } else {
            AlertSeverity::Low
        }
    }

    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        for (name, value) in [
            ("severity.confidence_weight", self.confidence_weight),
            ("severity.count_weight", self.count_weight),
            ("severity.medium_at", self.medium_at),
            ("severity.high_at", self.high_at),
            ("severity.critical_at", self.critical_at),
        ] {
            if !(0.0..=1.0).contains(&value) {
                problems.push(format!("{name} must be in [0, 1], got {value}"));
            }
        }
        if !(self.medium_at <= self.high_at && self.high_at <= self.critical_at) {
            problems.push("severity cut points must be ascending".to_string());
        }
        problems
    }
}

/// When a finding joins an existing open alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergePolicy {
    /// Minimum evidence-window overlap, as a fraction of the shorter window
    pub min_overlap_fraction: f64,
}

impl Default for MergePolicy {
    fn default() -> Self {
        Self {
            min_overlap_fraction: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertsConfig {
    pub merge: MergePolicy,
    pub severity: SeverityPolicy,
    /// Longest an ingest waits for the alert book before reporting busy
    pub lock_timeout_ms: u64,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            merge: MergePolicy::default(),
            severity: SeverityPolicy::default(),
            lock_timeout_ms: 50,
        }
    }
}

impl AlertsConfig {
    pub fn problems(&self) -> Vec<String> {
        let mut problems = self.severity.problems();
        if !(0.0..=1.0).contains(&self.merge.min_overlap_fraction) {
            problems.push(format!(
                "merge.min_overlap_fraction must be in [0, 1], got {}",
                self.merge.min_overlap_fraction
            ));
        }
        problems
    }
}
