//! Spoofing Detection
//!
//! Fires on a CANCEL when all of the following hold within the window:
//! - the cancelled order rested less than `min_resting`
//! - it was large relative to the trader's average order size
//! - the same trader traded on the opposite side at a better price than the
//!   cancelled order, after placing it
//! - the cancel came within `cancel_latency` of that trade
//!
//! Confidence grows with relative size and shrinks with resting time.

use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use sentinel_core::{EventType, Finding, OrderId, PatternType, Quantity, TradeEvent};
use sentinel_ports::{GraphView, WindowView};

use crate::config::SpoofingConfig;
use crate::util::{duration_fraction, ratio, saturate};

pub const NAME: &str = "spoofing";

#[derive(Debug, Clone)]
pub struct SpoofingDetector {
    config: SpoofingConfig,
}

impl SpoofingDetector {
    pub fn new(config: SpoofingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SpoofingConfig {
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
        let order = graph.order(&cancel.order_id).ok()?;
        if order.inferred || order.remaining_quantity.is_zero() {
            return None;
        }

        let resting = cancel.timestamp - order.first_seen;
        if resting >= cfg.min_resting() {
            return None;
        }
        let size = order.original_quantity;
        if size < cfg.min_order_quantity || size.is_zero() {
            return None;
        }

        let key = cancel.window_key();
        let events = windows.events_at(&key, cfg.lookback(), cancel.timestamp);

        let size_ratio = ratio(size, average_order_size(&events)?);
        if size_ratio < cfg.min_size_ratio {
            return None;
        }

        // Latest qualifying opposite-side trade before the cancel
        let trade = events.iter().rev().find(|e| {
            e.is_fill()
                && e.side == order.side.opposite()
                && e.order_id != order.order_id
                && e.timestamp >= order.first_seen
                && e.timestamp <= cancel.timestamp
                && cancel.timestamp - e.timestamp <= cfg.cancel_latency()
                && (e.price - order.price) * order.side.sign() > cfg.min_price_improvement
        })?;

        let confidence = cfg.size_weight * saturate(size_ratio, cfg.size_saturation)
            + cfg.resting_weight * (1.0 - duration_fraction(resting, cfg.min_resting()));
        if confidence < cfg.min_confidence {
            return None;
        }

        let placed = events
            .iter()
            .find(|e| e.order_id == order.order_id && e.event_type == EventType::New);
        let mut evidence: Vec<&TradeEvent> = Vec::with_capacity(3);
        if let Some(placed) = placed {
            evidence.push(placed);
        }
        evidence.push(trade);
        evidence.push(cancel);

        log::debug!(
            "Spoofing: {} cancelled {} ({} x avg) after {}ms, {}ms after opposite trade {}",
            key,
            order.order_id,
            size_ratio,
            resting.num_milliseconds(),
            (cancel.timestamp - trade.timestamp).num_milliseconds(),
            trade.event_id
        );

        Some(
            Finding::from_evidence(
                NAME,
                PatternType::Spoofing,
                key,
                confidence,
                &evidence,
                cancel.timestamp,
            )
            .with_summary(format!(
                "{} {} {} @ {} cancelled after {}ms, {}ms after trading {} {} @ {}",
                cancel.trader_id,
                order.side,
                size,
                order.price,
                resting.num_milliseconds(),
                (cancel.timestamp - trade.timestamp).num_milliseconds(),
                trade.quantity,
                cancel.instrument_id,
                trade.price
            )),
        )
    }
}

/// Average size of the distinct orders placed in the window, by first-seen quantity
fn average_order_size(events: &[Arc<TradeEvent>]) -> Option<Quantity> {
    let mut sizes: HashMap<&OrderId, Quantity> = HashMap::new();
    for e in events {
        if matches!(e.event_type, EventType::New | EventType::Fill) {
            sizes.entry(&e.order_id).or_insert(e.quantity);
        }
    }
    if sizes.is_empty() {
        return None;
    }
    let total: Decimal = sizes.values().copied().sum();
    Some(total / Decimal::from(sizes.len()))
}
