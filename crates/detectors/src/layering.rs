//! Layering Detection
//!
//! ```text
//!  price
//!    │  ▓▓▓▓▓ L3 ─────────────┐x
//!    │  ▓▓▓▓▓ L2 ───────────┐x│     ▓ resting orders on one side
//!    │  ▓▓▓▓▓ L1 ─────────┐x│ │     ● opposite-side execution
//!    │                 ●  │ │ │     x rapid cancels
//!    └──────────────────────────── time
//! ```
//!
//! Fires on the CANCEL that pushes the cancelled share of a layer to
//! `min_cancel_ratio`, where the layer is the set of the trader's orders on
//! the cancelled side resting at `min_layers` or more distinct prices when an
//! opposite-side execution happened, and cancels count only within
//! `cancel_window` of that execution.

use std::collections::{BTreeSet, HashMap};

use sentinel_core::{
    EventType, Finding, OrderId, PatternType, Price, Quantity, Side, Timestamp, TradeEvent,
};
use sentinel_ports::{GraphView, WindowView};

use crate::config::LayeringConfig;
use crate::util::saturate;

pub const NAME: &str = "layering";

#[derive(Debug, Clone)]
pub struct LayeringDetector {
    config: LayeringConfig,
}

/// One order's life as seen in the window
#[derive(Debug)]
struct Interval<'a> {
    placed: &'a TradeEvent,
    side: Side,
    price: Price,
    remaining: Quantity,
    filled: Quantity,
    /// Final fill or cancel
    ended: Option<Timestamp>,
    cancel: Option<&'a TradeEvent>,
}

impl Interval<'_> {
    fn resting_at(&self, at: Timestamp) -> bool {
        self.placed.timestamp <= at && self.ended.is_none_or(|end| end > at)
    }
}

impl LayeringDetector {
    pub fn new(config: LayeringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LayeringConfig {
        &self.config
    }

    pub fn evaluate(
        &self,
        event: &TradeEvent,
        graph: &dyn GraphView,
        windows: &dyn WindowView,
    ) -> Vec<Finding> {
        if event.event_type != EventType::Cancel {
            return Vec::new();
        }
        self.check_cancel(event, graph, windows)
            .into_iter()
            .collect()
    }

    fn check_cancel(
        &self,
        cancel: &TradeEvent,
        graph: &dyn GraphView,
        windows: &dyn WindowView,
    ) -> Option<Finding> {
        let cfg = &self.config;
        let key = cancel.window_key();
        let events = windows.events_at(&key, cfg.lookback(), cancel.timestamp);

        // Side as opened; the cancel's own side is the fallback for an evicted order
        let side = graph
            .order(&cancel.order_id)
            .map(|o| o.side)
            .unwrap_or(cancel.side);

        let execution = events.iter().rev().find(|e| {
            e.is_fill()
                && e.side == side.opposite()
                && e.timestamp <= cancel.timestamp
                && cancel.timestamp - e.timestamp <= cfg.cancel_window()
        })?;
        let executed_at = execution.timestamp;

        let intervals = build_intervals(&events);
        let layer: Vec<&Interval> = intervals
            .values()
            .filter(|i| i.side == side && i.resting_at(executed_at))
            .collect();
        if !layer.iter().any(|i| i.placed.order_id == cancel.order_id) {
            return None;
        }

        let levels: BTreeSet<Price> = layer.iter().map(|i| i.price).collect();
        if levels.len() < cfg.min_layers {
            return None;
        }

        let cancelled: Vec<&TradeEvent> = layer
            .iter()
            .filter_map(|i| i.cancel)
            .filter(|c| c.timestamp >= executed_at && c.timestamp - executed_at <= cfg.cancel_window())
            .collect();
        let total = layer.len() as f64;
        let ratio_now = cancelled.len() as f64 / total;
        let ratio_before = cancelled.len().saturating_sub(1) as f64 / total;
        if ratio_now < cfg.min_cancel_ratio || ratio_before >= cfg.min_cancel_ratio {
            return None;
        }

        let confidence = cfg.depth_weight
            * saturate(levels.len() as f64, cfg.layer_saturation as f64)
            + cfg.cancel_weight * ratio_now;
        if confidence < cfg.min_confidence {
            return None;
        }

        log::debug!(
            "Layering: {} {} orders over {} levels, {} cancelled after execution {}",
            key,
            layer.len(),
            levels.len(),
            cancelled.len(),
            execution.event_id
        );

        let mut evidence: Vec<&TradeEvent> = layer.iter().map(|i| i.placed).collect();
        evidence.push(execution);
        evidence.extend(cancelled.iter().copied());

        Some(
            Finding::from_evidence(
                NAME,
                PatternType::Layering,
                key,
                confidence,
                &evidence,
                cancel.timestamp,
            )
            .with_summary(format!(
                "{} layered {} {} orders over {} price levels on {}, then cancelled {} of them after trading {} {}",
                cancel.trader_id,
                layer.len(),
                side,
                levels.len(),
                cancel.instrument_id,
                cancelled.len(),
                execution.side,
                execution.quantity
            )),
        )
    }
}

/// Order intervals keyed by order id, for orders whose placement is in the window
fn build_intervals(events: &[std::sync::Arc<TradeEvent>]) -> HashMap<&OrderId, Interval<'_>> {
    let mut intervals: HashMap<&OrderId, Interval> = HashMap::new();
    for e in events {
        match e.event_type {
            EventType::New => {
                intervals.entry(&e.order_id).or_insert(Interval {
                    placed: e.as_ref(),
                    side: e.side,
                    price: e.price,
                    remaining: e.quantity,
                    filled: Quantity::ZERO,
                    ended: None,
                    cancel: None,
                });
            }
            EventType::Modify => {
                if let Some(interval) = intervals.get_mut(&e.order_id) {
                    interval.price = e.price;
                    interval.remaining = e.quantity - interval.filled;
                }
            }
            EventType::Cancel => {
                if let Some(interval) = intervals.get_mut(&e.order_id)
                    && interval.ended.is_none()
                {
                    interval.ended = Some(e.timestamp);
                    interval.cancel = Some(e.as_ref());
                }
            }
            EventType::Fill => {
                if let Some(interval) = intervals.get_mut(&e.order_id)
                    && interval.ended.is_none()
                {
                    interval.filled += e.quantity;
                    interval.remaining -= e.quantity;
                    if interval.remaining <= Quantity::ZERO {
                        interval.ended = Some(e.timestamp);
                    }
                }
            }
        }
    }
    intervals
}
