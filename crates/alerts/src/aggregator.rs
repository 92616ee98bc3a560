//! Alert aggregator
//!
//! Findings become alerts here. A finding merges into an open alert when it
//! has the same pattern and instrument, shares at least one trader, and its
//! evidence window overlaps the alert's by `min_overlap_fraction`. Among
//! several candidates the best overlap wins, then the oldest alert.
//!
//! Status only changes through `dispose`; the detection path never moves an
//! alert out of NEW.

use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::time::Duration;

use sentinel_core::{
    Alert, AlertId, Disposition, Finding, FindingId, InstrumentId, LookupKind, NotFoundError,
    OrderId, PatternType, Timestamp, TraderId,
};

use crate::error::{AlertError, AlertResult};
use crate::policy::AlertsConfig;
use crate::query::AlertQuery;

/// What `ingest` did with a finding
#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    Created(Alert),
    Merged(Alert),
    /// Finding was ingested before; the alert is unchanged
    Duplicate(Alert),
}

impl IngestOutcome {
    pub fn alert(&self) -> &Alert {
        match self {
            IngestOutcome::Created(a) | IngestOutcome::Merged(a) | IngestOutcome::Duplicate(a) => a,
        }
    }

    pub fn alert_id(&self) -> AlertId {
        self.alert().alert_id
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlertStats {
    pub total: usize,
    pub open: usize,
    pub findings: usize,
}

#[derive(Default)]
struct AlertBook {
    alerts: HashMap<AlertId, Alert>,
    /// Creation order; position is the alert's sequence number
    created: Vec<AlertId>,
    sequence: HashMap<AlertId, usize>,
    open: HashMap<(PatternType, InstrumentId), Vec<AlertId>>,
    by_trader: HashMap<TraderId, Vec<AlertId>>,
    findings: HashMap<FindingId, AlertId>,
}

impl AlertBook {
    fn best_match(&self, finding: &Finding, min_overlap: f64) -> Option<AlertId> {
        let candidates = self
            .open
            .get(&(finding.pattern_type, finding.instrument_id.clone()))?;
        candidates
            .iter()
            .filter_map(|id| self.alerts.get(id))
            .filter(|alert| alert.is_open())
            .filter(|alert| finding.trader_ids.iter().any(|t| alert.trader_ids.contains(t)))
            .map(|alert| {
                let overlap = alert.evidence_window.overlap_fraction(&finding.evidence_window);
                let seq = self.sequence.get(&alert.alert_id).copied().unwrap_or(usize::MAX);
                (alert.alert_id, overlap, seq)
            })
            .filter(|(_, overlap, _)| *overlap >= min_overlap)
            .max_by(|a, b| a.1.total_cmp(&b.1).then(b.2.cmp(&a.2)))
            .map(|(id, _, _)| id)
    }

    fn index_traders(&mut self, alert_id: AlertId, traders: impl IntoIterator<Item = TraderId>) {
        for trader in traders {
            let ids = self.by_trader.entry(trader).or_default();
            if !ids.contains(&alert_id) {
                ids.push(alert_id);
            }
        }
    }

    fn close(&mut self, alert: &Alert) {
        if let Some(ids) = self
            .open
            .get_mut(&(alert.pattern_type, alert.instrument_id.clone()))
        {
            ids.retain(|id| *id != alert.alert_id);
        }
    }

    /// Newest first
    fn newest<'a>(&'a self, ids: impl DoubleEndedIterator<Item = &'a AlertId>) -> impl Iterator<Item = &'a Alert> {
        ids.rev().filter_map(|id| self.alerts.get(id))
    }
}

pub struct AlertAggregator {
    config: AlertsConfig,
    book: RwLock<AlertBook>,
}

impl AlertAggregator {
    pub fn new(config: AlertsConfig) -> Self {
        Self {
            config,
            book: RwLock::new(AlertBook::default()),
        }
    }

    pub fn config(&self) -> &AlertsConfig {
        &self.config
    }

    fn validate(finding: &Finding) -> AlertResult<()> {
        if !finding.confidence.is_finite() || !(0.0..=1.0).contains(&finding.confidence) {
            return Err(AlertError::InvalidFinding(format!(
                "confidence {} outside [0, 1]",
                finding.confidence
            )));
        }
        if finding.trader_ids.is_empty() {
            return Err(AlertError::InvalidFinding("no traders".to_string()));
        }
        if finding.instrument_id.is_empty() {
            return Err(AlertError::InvalidFinding("no instrument".to_string()));
        }
        Ok(())
    }

    /// Merge a finding into a matching open alert or open a new one
    pub fn ingest(&self, finding: &Finding, now: Timestamp) -> AlertResult<IngestOutcome> {
        Self::validate(finding)?;

        let timeout_ms = self.config.lock_timeout_ms;
        let mut book = self
            .book
            .try_write_for(Duration::from_millis(timeout_ms))
            .ok_or(AlertError::Busy { timeout_ms })?;

        if let Some(alert) = book
            .findings
            .get(&finding.finding_id)
            .and_then(|id| book.alerts.get(id))
        {
            return Ok(IngestOutcome::Duplicate(alert.clone()));
        }

        let severity = &self.config.severity;
        match book.best_match(finding, self.config.merge.min_overlap_fraction) {
            Some(alert_id) => {
                let Some(alert) = book.alerts.get_mut(&alert_id) else {
                    return Err(NotFoundError::new(LookupKind::Alert, alert_id.to_string()).into());
                };
                let before = alert.severity;
                alert.merge(finding, now);
                let score = severity.score(alert.evidence_count(), alert.max_confidence);
                alert.raise_severity(severity.level(score), score);
                let merged = alert.clone();

                book.findings.insert(finding.finding_id, alert_id);
                book.index_traders(alert_id, finding.trader_ids.iter().cloned());

                if merged.severity > before {
                    log::info!(
                        "Alert {} ({} on {}) escalated to {:?} after {} findings",
                        alert_id,
                        merged.pattern_type,
                        merged.instrument_id,
                        merged.severity,
                        merged.evidence_count()
                    );
                } else {
                    log::debug!("Finding {} merged into alert {}", finding.finding_id, alert_id);
                }
                Ok(IngestOutcome::Merged(merged))
            }
            None => {
                let score = severity.score(1, finding.confidence);
                let alert = Alert::from_finding(finding, severity.level(score), score, now);
                let alert_id = alert.alert_id;

                let seq = book.created.len();
                book.created.push(alert_id);
                book.sequence.insert(alert_id, seq);
                book.open
                    .entry((alert.pattern_type, alert.instrument_id.clone()))
                    .or_default()
                    .push(alert_id);
                book.index_traders(alert_id, alert.trader_ids.iter().cloned());
                book.findings.insert(finding.finding_id, alert_id);
                book.alerts.insert(alert_id, alert.clone());

                log::info!(
                    "Alert {} created: {} on {} for {:?} ({:?}, score {:.2})",
                    alert_id,
                    alert.pattern_type,
                    alert.instrument_id,
                    alert.trader_ids,
                    alert.severity,
                    alert.severity_score
                );
                Ok(IngestOutcome::Created(alert))
            }
        }
    }

    /// Apply an external disposition
    pub fn dispose(
        &self,
        alert_id: AlertId,
        disposition: &Disposition,
        now: Timestamp,
    ) -> AlertResult<Alert> {
        let mut book = self.book.write();
        let alert = book
            .alerts
            .get_mut(&alert_id)
            .ok_or_else(|| NotFoundError::new(LookupKind::Alert, alert_id.to_string()))?;
        let from = alert.status();
        let to = alert.dispose(disposition, now)?;
        let alert = alert.clone();
        if to.is_terminal() {
            book.close(&alert);
        }
        log::info!(
            "Alert {} {:?} -> {:?}{}",
            alert_id,
            from,
            to,
            disposition
                .reviewer
                .as_deref()
                .map(|r| format!(" by {r}"))
                .unwrap_or_default()
        );
        Ok(alert)
    }

    pub fn get(&self, alert_id: AlertId) -> AlertResult<Alert> {
        self.book
            .read()
            .alerts
            .get(&alert_id)
            .cloned()
            .ok_or_else(|| NotFoundError::new(LookupKind::Alert, alert_id.to_string()).into())
    }

    /// Alerts implicating `trader`, newest first
    pub fn alerts_for_trader(&self, trader: &str, limit: usize) -> Vec<Alert> {
        let book = self.book.read();
        match book.by_trader.get(trader) {
            Some(ids) => book.newest(ids.iter()).take(limit).cloned().collect(),
            None => Vec::new(),
        }
    }

    /// Alerts of one pattern, newest first
    pub fn alerts_by_pattern(&self, pattern: PatternType, limit: usize) -> Vec<Alert> {
        let book = self.book.read();
        book.newest(book.created.iter())
            .filter(|a| a.pattern_type == pattern)
            .take(limit)
            .cloned()
            .collect()
    }

    /// Alerts matching every set criterion, newest first
    pub fn search(&self, query: &AlertQuery) -> Vec<Alert> {
        let book = self.book.read();
        book.newest(book.created.iter())
            .filter(|a| query.matches(a))
            .take(query.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }

    /// Every alert in creation order
    pub fn all(&self) -> Vec<Alert> {
        let book = self.book.read();
        book.created
            .iter()
            .filter_map(|id| book.alerts.get(id))
            .cloned()
            .collect()
    }

    /// Orders referenced by open alerts; the graph must not evict them
    pub fn pinned_orders(&self) -> HashSet<OrderId> {
        let book = self.book.read();
        book.alerts
            .values()
            .filter(|a| a.is_open())
            .flat_map(|a| a.evidence_order_ids.iter().cloned())
            .collect()
    }

    pub fn stats(&self) -> AlertStats {
        let book = self.book.read();
        AlertStats {
            total: book.alerts.len(),
            open: book.alerts.values().filter(|a| a.is_open()).count(),
            findings: book.findings.len(),
        }
    }
}

impl Default for AlertAggregator {
    fn default() -> Self {
        Self::new(AlertsConfig::default())
    }
}
