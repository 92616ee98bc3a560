//! Periodic eviction of expired window events and graph state

use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{MissedTickBehavior, interval};

use sentinel_alerts::AlertAggregator;
use sentinel_core::Timestamp;
use sentinel_graph::{EntityGraph, EvictionStats};
use sentinel_ports::Clock;
use sentinel_window::WindowManager;

use crate::stats::Counters;

/// What one sweep removed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub at: Timestamp,
    pub events: usize,
    pub graph: EvictionStats,
}

#[derive(Clone)]
pub(crate) struct Sweeper {
    pub graph: Arc<EntityGraph>,
    pub windows: Arc<WindowManager>,
    pub aggregator: Arc<AlertAggregator>,
    pub clock: Arc<dyn Clock>,
    pub use_event_time: bool,
    pub counters: Arc<Counters>,
}

impl Sweeper {
    fn sweep_time(&self) -> Option<Timestamp> {
        if self.use_event_time {
            self.windows.watermark()
        } else {
            Some(self.clock.now())
        }
    }

    /// Nothing to do before the first event when sweeping on event time
    pub fn sweep(&self) -> Option<SweepReport> {
        let at = self.sweep_time()?;
        let events = self.windows.evict_expired(at);
        let pinned = self.aggregator.pinned_orders();
        let graph = self
            .graph
            .evict_expired(at, self.graph.config().retention(), &pinned);

        Counters::add(&self.counters.evicted_events, events);
        Counters::add(&self.counters.evicted_orders, graph.orders);
        log::debug!(
            "Sweep at {}: {} events, {} orders, {} edges, {} nodes",
            at,
            events,
            graph.orders,
            graph.edges,
            graph.nodes
        );
        Some(SweepReport { at, events, graph })
    }

    pub async fn run(self, every: std::time::Duration, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick completes immediately
        ticker.tick().await;
        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                _ = ticker.tick() => {
                    self.sweep();
                }
            }
        }
        log::info!("Sweeper stopped");
    }
}
