use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

use super::finding::{EvidenceWindow, Finding, FindingId, PatternType};
use crate::error::TransitionError;
use crate::values::{EventId, InstrumentId, OrderId, Timestamp, TraderId};

/// Unique identifier for an alert
pub type AlertId = Uuid;

/// Alert lifecycle status.
///
/// ```text
/// NEW ──StartReview──► UNDER_REVIEW ──Confirm──► CONFIRMED
///                            └────────Dismiss──► DISMISSED
/// ```
///
/// No decision leads back to `New`, and terminal states accept nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertStatus {
    New,
    UnderReview,
    Confirmed,
    Dismissed,
}

/// External disposition decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    StartReview,
    Confirm,
    Dismiss,
}

impl AlertStatus {
    /// Open alerts still accept corroborating findings
    pub fn is_open(&self) -> bool {
        matches!(self, AlertStatus::New | AlertStatus::UnderReview)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_open()
    }

    /// The transition table of the lifecycle
    pub fn apply(self, decision: Decision) -> Result<AlertStatus, TransitionError> {
        match (self, decision) {
            (AlertStatus::New, Decision::StartReview) => Ok(AlertStatus::UnderReview),
            (AlertStatus::UnderReview, Decision::Confirm) => Ok(AlertStatus::Confirmed),
            (AlertStatus::UnderReview, Decision::Dismiss) => Ok(AlertStatus::Dismissed),
            (from, decision) => Err(TransitionError { from, decision }),
        }
    }
}

/// Discrete severity band derived from the severity score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
    Critical,
}

/// Disposition request coming through the dispatch boundary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disposition {
    pub decision: Decision,
    pub reviewer: Option<String>,
    pub commentary: Option<String>,
}

impl Disposition {
    pub fn new(decision: Decision) -> Self {
        Self {
            decision,
            reviewer: None,
            commentary: None,
        }
    }

    pub fn by(mut self, reviewer: impl Into<String>) -> Self {
        self.reviewer = Some(reviewer.into());
        self
    }

    pub fn with_commentary(mut self, commentary: impl Into<String>) -> Self {
        self.commentary = Some(commentary.into());
        self
    }
}

/// One accepted disposition in an alert's review trail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewEntry {
    pub from: AlertStatus,
    pub to: AlertStatus,
    pub reviewer: Option<String>,
    pub commentary: Option<String>,
    pub at: Timestamp,
}

/// Aggregated, scored, lifecycle-managed surveillance output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub alert_id: AlertId,
    pub pattern_type: PatternType,
    pub trader_ids: BTreeSet<TraderId>,
    pub instrument_id: InstrumentId,
    pub severity: AlertSeverity,
    /// In [0, 1]; never decreases across merges
    pub severity_score: f64,
    status: AlertStatus,
    pub supporting_finding_ids: Vec<FindingId>,
    pub evidence_event_ids: BTreeSet<EventId>,
    pub evidence_order_ids: BTreeSet<OrderId>,
    pub evidence_window: EvidenceWindow,
    pub max_confidence: f64,
    pub detectors: BTreeSet<String>,
    pub summaries: Vec<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub review_trail: Vec<ReviewEntry>,
}

impl Alert {
    /// Open a NEW alert from its first qualifying finding
    pub fn from_finding(
        finding: &Finding,
        severity: AlertSeverity,
        severity_score: f64,
        now: Timestamp,
    ) -> Self {
        let mut alert = Self {
            alert_id: Uuid::new_v4(),
            pattern_type: finding.pattern_type,
            trader_ids: BTreeSet::new(),
            instrument_id: finding.instrument_id.clone(),
            severity,
            severity_score,
            status: AlertStatus::New,
            supporting_finding_ids: Vec::new(),
            evidence_event_ids: BTreeSet::new(),
            evidence_order_ids: BTreeSet::new(),
            evidence_window: finding.evidence_window,
            max_confidence: finding.confidence,
            detectors: BTreeSet::new(),
            summaries: Vec::new(),
            created_at: now,
            updated_at: now,
            review_trail: Vec::new(),
        };
        alert.absorb_evidence(finding);
        alert
    }

    pub fn status(&self) -> AlertStatus {
        self.status
    }

    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }

    /// Number of findings merged into this alert
    pub fn evidence_count(&self) -> usize {
        self.supporting_finding_ids.len()
    }

    /// Union a corroborating finding into this alert. Severity is set by the caller.
    pub fn merge(&mut self, finding: &Finding, now: Timestamp) {
        self.absorb_evidence(finding);
        self.evidence_window = self.evidence_window.union(&finding.evidence_window);
        self.max_confidence = self.max_confidence.max(finding.confidence);
        self.updated_at = now;
    }

    fn absorb_evidence(&mut self, finding: &Finding) {
        self.trader_ids.extend(finding.trader_ids.iter().cloned());
        self.evidence_event_ids
            .extend(finding.evidence_event_ids.iter().cloned());
        self.evidence_order_ids
            .extend(finding.evidence_order_ids.iter().cloned());
        self.supporting_finding_ids.push(finding.finding_id);
        self.detectors.insert(finding.detector_name.clone());
        if !finding.summary.is_empty() {
            self.summaries.push(finding.summary.clone());
        }
    }

    /// Raise severity; lower values are ignored
    pub fn raise_severity(&mut self, severity: AlertSeverity, score: f64) {
        if score > self.severity_score {
            self.severity_score = score;
        }
        if severity > self.severity {
            self.severity = severity;
        }
    }

    /// Apply an external disposition, recording it in the review trail
    pub fn dispose(
        &mut self,
        disposition: &Disposition,
        now: Timestamp,
    ) -> Result<AlertStatus, TransitionError> {
        let from = self.status;
        let to = from.apply(disposition.decision)?;
        self.status = to;
        self.updated_at = now;
        self.review_trail.push(ReviewEntry {
            from,
            to,
            reviewer: disposition.reviewer.clone(),
            commentary: disposition.commentary.clone(),
            at: now,
        });
        Ok(to)
    }
}
