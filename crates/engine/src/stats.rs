use std::sync::atomic::{AtomicU64, Ordering};

use sentinel_alerts::AlertStats;
use sentinel_graph::GraphStats;
use sentinel_normalizer::NormalizerStats;
use sentinel_window::WindowStats;

#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub accepted: AtomicU64,
    pub rejected: AtomicU64,
    pub overloaded: AtomicU64,
    pub duplicates: AtomicU64,
    pub processed: AtomicU64,
    pub findings: AtomicU64,
    pub alerts_created: AtomicU64,
    pub alerts_merged: AtomicU64,
    pub invariant_violations: AtomicU64,
    pub quarantined_drops: AtomicU64,
    pub discarded_findings: AtomicU64,
    pub delivery_failures: AtomicU64,
    pub evicted_events: AtomicU64,
    pub evicted_orders: AtomicU64,
}

impl Counters {
    pub fn inc(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(counter: &AtomicU64, n: usize) {
        counter.fetch_add(n as u64, Ordering::Relaxed);
    }
}

/// Point-in-time engine counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub accepted: u64,
    pub rejected: u64,
    pub overloaded: u64,
    /// Events the graph had already applied
    pub duplicates: u64,
    pub processed: u64,
    pub findings: u64,
    pub alerts_created: u64,
    pub alerts_merged: u64,
    pub invariant_violations: u64,
    /// Events refused because they touch a quarantined partition
    pub quarantined_drops: u64,
    /// Findings thrown away because they completed during shutdown
    pub discarded_findings: u64,
    pub delivery_failures: u64,
    pub evicted_events: u64,
    pub evicted_orders: u64,
    pub in_flight: usize,
    pub normalizer: NormalizerStats,
    pub graph: GraphStats,
    pub windows: WindowStats,
    pub alerts: AlertStats,
}

impl EngineStats {
    pub(crate) fn from_counters(c: &Counters) -> Self {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        Self {
            accepted: load(&c.accepted),
            rejected: load(&c.rejected),
            overloaded: load(&c.overloaded),
            duplicates: load(&c.duplicates),
            processed: load(&c.processed),
            findings: load(&c.findings),
            alerts_created: load(&c.alerts_created),
            alerts_merged: load(&c.alerts_merged),
            invariant_violations: load(&c.invariant_violations),
            quarantined_drops: load(&c.quarantined_drops),
            discarded_findings: load(&c.discarded_findings),
            delivery_failures: load(&c.delivery_failures),
            evicted_events: load(&c.evicted_events),
            evicted_orders: load(&c.evicted_orders),
            ..Default::default()
        }
    }
}
