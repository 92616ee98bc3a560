//! Front-Running Detection
//!
//! ```text
//!  A: NEW(open side) ─┬─ fills ............................ close fills ─► FILL (trigger)
//!                     │ ≤ δ                                 ≤ close_window
//!  B:                 └──► large NEW(same side) ── fill ───┘
//! ```
//!
//! Fires on trader A's FILL that closes (at least `close_fraction` of) a
//! position A opened with an order placed shortly before a large same-side
//! order from a trader B connected to A in the entity graph, once B's order
//! has executed. B is connected when the two are direct counterparties or
//! trade through a shared account.

use std::collections::BTreeSet;
use std::sync::Arc;

use rust_decimal::Decimal;
use sentinel_core::{
    EntityKind, EntityRef, EventType, Finding, PatternType, Quantity, Relation, TradeEvent,
    TraderId,
};
use sentinel_ports::{GraphView, WindowView};

use crate::config::FrontRunningConfig;
use crate::util::{duration_fraction, ratio, saturate};

pub const NAME: &str = "front_running";

#[derive(Debug, Clone)]
pub struct FrontRunningDetector {
    config: FrontRunningConfig,
}

/// A leading order of the suspect with the fills that opened the position
struct Lead<'a> {
    placed: &'a TradeEvent,
    fills: Vec<&'a TradeEvent>,
    opened: Quantity,
}

struct Candidate<'a> {
    confidence: f64,
    lead: Lead<'a>,
    large: &'a TradeEvent,
    large_fill: &'a TradeEvent,
    closes: Vec<&'a TradeEvent>,
    closed: Quantity,
}

impl FrontRunningDetector {
    pub fn new(config: FrontRunningConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FrontRunningConfig {
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
        let cfg = &self.config;
        let connected = self.connected_traders(&event.trader_id, graph);
        if connected.is_empty() {
            return Vec::new();
        }

        let own = windows.events_at(&event.window_key(), cfg.lookback(), event.timestamp);
        let leads = leading_orders(&own, event);
        if leads.is_empty() {
            return Vec::new();
        }
        let market: Vec<Arc<TradeEvent>> = windows
            .instrument_events(&event.instrument_id, cfg.lookback(), event.timestamp)
            .into_iter()
            .filter(|e| connected.contains(&e.trader_id))
            .collect();

        let mut findings = Vec::new();
        for trader in &connected {
            let best = leads
                .iter()
                .filter_map(|lead| self.match_large_order(event, lead, trader, &market, &own))
                .max_by(|a, b| a.confidence.total_cmp(&b.confidence));
            if let Some(candidate) = best {
                findings.push(self.finding(event, trader, candidate));
            }
        }
        findings
    }

    /// Traders directly trading with `trader`, or sharing one of its accounts
    fn connected_traders(&self, trader: &TraderId, graph: &dyn GraphView) -> BTreeSet<TraderId> {
        let within = self.config.connection_within();
        let me = EntityRef::trader(trader);
        let mut connected: BTreeSet<TraderId> = graph
            .neighbors(&me, Relation::CounterpartyOf, within)
            .into_iter()
            .map(|e| e.id)
            .collect();
        for account in graph.neighbors(&me, Relation::CoLocatedWith, within) {
            connected.extend(
                graph
                    .neighbors(&account, Relation::CoLocatedWith, within)
                    .into_iter()
                    .filter(|e| e.kind == EntityKind::Trader)
                    .map(|e| e.id),
            );
        }
        connected.remove(trader);
        connected
    }

    fn match_large_order<'a>(
        &self,
        close: &'a TradeEvent,
        lead: &Lead<'a>,
        trader: &TraderId,
        market: &'a [Arc<TradeEvent>],
        own: &'a [Arc<TradeEvent>],
    ) -> Option<Candidate<'a>> {
        let cfg = &self.config;
        let t_a = lead.placed.timestamp;

        let (large, large_fill) = market
            .iter()
            .filter(|e| {
                &e.trader_id == trader
                    && e.event_type == EventType::New
                    && e.side == lead.placed.side
                    && e.quantity >= cfg.min_large_quantity
                    && e.timestamp > t_a
                    && e.timestamp - t_a <= cfg.lead_window()
            })
            .find_map(|large| {
                market
                    .iter()
                    .find(|f| {
                        f.is_fill()
                            && f.order_id == large.order_id
                            && f.timestamp >= large.timestamp
                            && f.timestamp <= close.timestamp
                            && close.timestamp - f.timestamp <= cfg.close_window()
                    })
                    .map(|fill| (large.as_ref(), fill.as_ref()))
            })?;

        // The suspect's opposite-side trades after the large execution
        let closes: Vec<&TradeEvent> = own
            .iter()
            .filter(|e| {
                e.is_fill()
                    && e.side == close.side
                    && e.timestamp >= large_fill.timestamp
                    && e.timestamp <= close.timestamp
            })
            .map(|e| e.as_ref())
            .collect();
        let closed: Quantity = closes.iter().map(|e| e.quantity).sum();
        let closed_before = closed - close.quantity;
        let needed = lead.opened * Decimal::try_from(cfg.close_fraction).unwrap_or(Decimal::ONE);
        if closed < needed || closed_before >= needed {
            return None;
        }

        let lead_gap = large.timestamp - t_a;
        let confidence = cfg.timing_weight * (1.0 - duration_fraction(lead_gap, cfg.lead_window()))
            + cfg.size_weight * saturate(ratio(large.quantity, lead.opened), cfg.size_saturation)
            + cfg.close_weight * ratio(closed, lead.opened).min(1.0);
        if confidence < cfg.min_confidence {
            return None;
        }

        Some(Candidate {
            confidence,
            lead: Lead {
                placed: lead.placed,
                fills: lead.fills.clone(),
                opened: lead.opened,
            },
            large,
            large_fill,
            closes,
            closed,
        })
    }

    fn finding(&self, close: &TradeEvent, trader: &TraderId, c: Candidate<'_>) -> Finding {
        log::debug!(
            "Front-running: {} opened {} ahead of {}'s {} by {}ms, closed {}",
            close.window_key(),
            c.lead.opened,
            trader,
            c.large.quantity,
            (c.large.timestamp - c.lead.placed.timestamp).num_milliseconds(),
            c.closed
        );

        let mut evidence = vec![c.lead.placed];
        evidence.extend(c.lead.fills.iter().copied());
        evidence.push(c.large);
        evidence.push(c.large_fill);
        evidence.extend(c.closes.iter().copied());

        Finding::from_evidence(
            NAME,
            PatternType::FrontRunning,
            close.window_key(),
            c.confidence,
            &evidence,
            close.timestamp,
        )
        .with_traders([trader.clone()])
        .with_summary(format!(
            "{} {} {} {}ms before connected trader {} placed {} {}, then closed {} after it executed",
            close.trader_id,
            c.lead.placed.side,
            c.lead.opened,
            (c.large.timestamp - c.lead.placed.timestamp).num_milliseconds(),
            trader,
            c.large.side,
            c.large.quantity,
            c.closed
        ))
    }
}

/// The suspect's filled orders on the side opposite to the closing trade
fn leading_orders<'a>(own: &'a [Arc<TradeEvent>], close: &TradeEvent) -> Vec<Lead<'a>> {
    let open_side = close.side.opposite();
    own.iter()
        .filter(|e| e.event_type == EventType::New && e.side == open_side)
        .filter_map(|placed| {
            let fills: Vec<&TradeEvent> = own
                .iter()
                .filter(|f| {
                    f.is_fill() && f.order_id == placed.order_id && f.timestamp <= close.timestamp
                })
                .map(|f| f.as_ref())
                .collect();
            let opened: Quantity = fills.iter().map(|f| f.quantity).sum();
            (!opened.is_zero()).then(|| Lead {
                placed: placed.as_ref(),
                fills,
                opened,
            })
        })
        .collect()
}
