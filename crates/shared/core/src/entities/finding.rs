use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::TradeEvent;
use crate::values::{EventId, InstrumentId, OrderId, Timestamp, TraderId};

/// Unique identifier for a finding
pub type FindingId = Uuid;

/// Misconduct pattern a finding or alert describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PatternType {
    Spoofing,
    WashTrading,
    Layering,
    FrontRunning,
}

impl fmt::Display for PatternType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PatternType::Spoofing => "SPOOFING",
            PatternType::WashTrading => "WASH_TRADING",
            PatternType::Layering => "LAYERING",
            PatternType::FrontRunning => "FRONT_RUNNING",
        };
        f.write_str(name)
    }
}

/// Window identity: one trader on one instrument
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WindowKey {
    pub trader_id: TraderId,
    pub instrument_id: InstrumentId,
}

impl WindowKey {
    pub fn new(trader_id: impl Into<TraderId>, instrument_id: impl Into<InstrumentId>) -> Self {
        Self {
            trader_id: trader_id.into(),
            instrument_id: instrument_id.into(),
        }
    }
}

impl fmt::Display for WindowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.trader_id, self.instrument_id)
    }
}

/// Closed time interval covered by a piece of evidence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceWindow {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl EvidenceWindow {
    pub fn new(a: Timestamp, b: Timestamp) -> Self {
        if a <= b {
            Self { start: a, end: b }
        } else {
            Self { start: b, end: a }
        }
    }

    /// Smallest window spanning all given events; `None` for an empty slice
    pub fn spanning<'a>(events: impl IntoIterator<Item = &'a TradeEvent>) -> Option<Self> {
        let mut iter = events.into_iter();
        let first = iter.next()?.timestamp;
        let (start, end) = iter.fold((first, first), |(lo, hi), e| {
            (lo.min(e.timestamp), hi.max(e.timestamp))
        });
        Some(Self { start, end })
    }

    pub fn len(&self) -> Duration {
        self.end - self.start
    }

    pub fn union(&self, other: &EvidenceWindow) -> EvidenceWindow {
        EvidenceWindow {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Overlap as a fraction of the shorter of the two windows, in [0, 1].
    ///
    /// Symmetric, so the merge decision does not depend on which window came first.
    /// A zero-length window counts as fully overlapping when it lies inside the other.
    pub fn overlap_fraction(&self, other: &EvidenceWindow) -> f64 {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        if end < start {
            return 0.0;
        }
        let shorter = self.len().min(other.len());
        if shorter.is_zero() {
            return 1.0;
        }
        let overlap = (end - start).num_milliseconds() as f64;
        (overlap / shorter.num_milliseconds() as f64).clamp(0.0, 1.0)
    }
}

/// Raw evidence produced by a single detector for a single pattern match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub finding_id: FindingId,
    pub detector_name: String,
    pub pattern_type: PatternType,
    /// Sorted, deduplicated
    pub trader_ids: Vec<TraderId>,
    pub instrument_id: InstrumentId,
    pub evidence_event_ids: Vec<EventId>,
    pub evidence_order_ids: Vec<OrderId>,
    /// In [0, 1]
    pub confidence: f64,
    pub window_key: WindowKey,
    pub evidence_window: EvidenceWindow,
    pub detected_at: Timestamp,
    /// One-line human-readable description of what matched
    pub summary: String,
}

impl Finding {
    /// Build a finding from its evidence events; the first trader is the window owner
    pub fn from_evidence(
        detector_name: impl Into<String>,
        pattern_type: PatternType,
        window_key: WindowKey,
        confidence: f64,
        evidence: &[&TradeEvent],
        detected_at: Timestamp,
    ) -> Self {
        let mut trader_ids = vec![window_key.trader_id.clone()];
        let mut evidence_event_ids = Vec::with_capacity(evidence.len());
        let mut evidence_order_ids = Vec::with_capacity(evidence.len());
        for e in evidence {
            evidence_event_ids.push(e.event_id.clone());
            evidence_order_ids.push(e.order_id.clone());
        }
        trader_ids.sort();
        trader_ids.dedup();
        evidence_order_ids.sort();
        evidence_order_ids.dedup();

        let evidence_window = EvidenceWindow::spanning(evidence.iter().copied())
            .unwrap_or_else(|| EvidenceWindow::new(detected_at, detected_at));

        Self {
            finding_id: Uuid::new_v4(),
            detector_name: detector_name.into(),
            pattern_type,
            trader_ids,
            instrument_id: window_key.instrument_id.clone(),
            evidence_event_ids,
            evidence_order_ids,
            confidence: confidence.clamp(0.0, 1.0),
            window_key,
            evidence_window,
            detected_at,
            summary: String::new(),
        }
    }

    /// Add further implicated traders (counterparties, connected traders)
    pub fn with_traders(mut self, traders: impl IntoIterator<Item = TraderId>) -> Self {
        self.trader_ids.extend(traders);
        self.trader_ids.sort();
        self.trader_ids.dedup();
        self
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }
}
