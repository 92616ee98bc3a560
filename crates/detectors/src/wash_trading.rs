//! Wash Trading Detection
//!
//! Fires on a FILL that names a counterparty when, inside the window, the
//! trader has both bought from and sold to that counterparty and the volumes
//! net out to within `epsilon`. The two traders must already share a
//! COUNTERPARTY_OF edge of sufficient weight; trading with oneself always
//! qualifies.
//!
//! A finding is emitted when this fill brings the pair into balance, not on
//! every later fill that keeps it balanced.

use rust_decimal::Decimal;
use sentinel_core::{EntityRef, Finding, PatternType, Quantity, Relation, Side, TradeEvent};
use sentinel_ports::{GraphView, WindowView};

use crate::config::WashTradingConfig;
use crate::util::{ratio, saturate};

pub const NAME: &str = "wash_trading";

#[derive(Debug, Clone)]
pub struct WashTradingDetector {
    config: WashTradingConfig,
}

/// Bought and sold volume against one counterparty
#[derive(Debug, Clone, Copy, Default)]
struct Legs {
    bought: Quantity,
    sold: Quantity,
}

impl Legs {
    fn add(&mut self, side: Side, quantity: Quantity) {
        match side {
            Side::Buy => self.bought += quantity,
            Side::Sell => self.sold += quantity,
        }
    }

    fn matched(&self) -> Quantity {
        self.bought.min(self.sold)
    }

    /// |bought - sold| / max(bought, sold)
    fn imbalance(&self) -> f64 {
        ratio((self.bought - self.sold).abs(), self.bought.max(self.sold))
    }

    fn balanced(&self, cfg: &WashTradingConfig) -> bool {
        self.bought > Decimal::ZERO
            && self.sold > Decimal::ZERO
            && self.matched() >= cfg.min_matched_quantity
            && self.imbalance() <= cfg.epsilon
    }
}

impl WashTradingDetector {
    pub fn new(config: WashTradingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &WashTradingConfig {
        &self.config
    }

    pub fn evaluate(
        &self,
        event: &TradeEvent,
        graph: &dyn GraphView,
        windows: &dyn WindowView,
    ) -> Vec<Finding> {
        if !event.is_fill() {
            return Vec::new();
        }
        self.check_fill(event, graph, windows).into_iter().collect()
    }

    fn check_fill(
        &self,
        fill: &TradeEvent,
        graph: &dyn GraphView,
        windows: &dyn WindowView,
    ) -> Option<Finding> {
        let cfg = &self.config;
        let counterparty = fill.counterparty_id.as_ref()?;
        let key = fill.window_key();

        let trades: Vec<_> = windows
            .events_at(&key, cfg.lookback(), fill.timestamp)
            .into_iter()
            .filter(|e| e.is_fill() && e.counterparty_id.as_ref() == Some(counterparty))
            .collect();

        let mut before = Legs::default();
        let mut after = Legs::default();
        for e in &trades {
            after.add(e.side, e.quantity);
            if e.event_id != fill.event_id {
                before.add(e.side, e.quantity);
            }
        }
        if !after.balanced(cfg) || before.balanced(cfg) {
            return None;
        }

        let self_trade = *counterparty == fill.trader_id;
        let edge_events = if self_trade {
            cfg.edge_saturation
        } else {
            graph
                .edge_weight(
                    &EntityRef::trader(&fill.trader_id),
                    &EntityRef::trader(counterparty),
                    Relation::CounterpartyOf,
                )
                .map(|w| w.event_count)
                .unwrap_or(0)
        };
        if !self_trade && edge_events < cfg.min_edge_events {
            return None;
        }

        let balance = if cfg.epsilon > 0.0 {
            1.0 - (after.imbalance() / cfg.epsilon).clamp(0.0, 1.0)
        } else {
            1.0
        };
        let confidence = cfg.balance_weight * balance
            + cfg.relationship_weight * saturate(edge_events as f64, cfg.edge_saturation as f64);
        if confidence < cfg.min_confidence {
            return None;
        }

        log::debug!(
            "Wash trading: {} vs {} bought {} sold {} (edge events {})",
            key,
            counterparty,
            after.bought,
            after.sold,
            edge_events
        );

        let evidence: Vec<&TradeEvent> = trades.iter().map(|e| e.as_ref()).collect();
        Some(
            Finding::from_evidence(
                NAME,
                PatternType::WashTrading,
                key,
                confidence,
                &evidence,
                fill.timestamp,
            )
            .with_traders([counterparty.clone()])
            .with_summary(format!(
                "{} bought {} and sold {} {} against {} with no net position change",
                fill.trader_id, after.bought, after.sold, fill.instrument_id, counterparty
            )),
        )
    }
}
