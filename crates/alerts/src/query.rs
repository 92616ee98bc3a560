use serde::{Deserialize, Serialize};

use sentinel_core::{
    Alert, AlertSeverity, AlertStatus, InstrumentId, PatternType, Timestamp, TraderId,
};

/// Alert search criteria; unset fields match everything
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertQuery {
    pub pattern_type: Option<PatternType>,
    pub status: Option<AlertStatus>,
    pub instrument_id: Option<InstrumentId>,
    pub trader_id: Option<TraderId>,
    /// Inclusive
    pub created_from: Option<Timestamp>,
    /// Exclusive
    pub created_to: Option<Timestamp>,
    pub min_severity: Option<AlertSeverity>,
    pub limit: Option<usize>,
}

impl AlertQuery {
    pub fn matches(&self, alert: &Alert) -> bool {
        self.pattern_type.is_none_or(|p| alert.pattern_type == p)
            && self.status.is_none_or(|s| alert.status() == s)
            && self
                .instrument_id
                .as_ref()
                .is_none_or(|i| &alert.instrument_id == i)
            && self
                .trader_id
                .as_ref()
                .is_none_or(|t| alert.trader_ids.contains(t))
            && self.created_from.is_none_or(|from| alert.created_at >= from)
            && self.created_to.is_none_or(|to| alert.created_at < to)
            && self.min_severity.is_none_or(|min| alert.severity >= min)
    }
}
