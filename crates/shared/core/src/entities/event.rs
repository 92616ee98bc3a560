use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::Side;
use super::finding::WindowKey;
use crate::values::{
    AccountId, EventId, FeedId, InstrumentId, OrderId, Price, Quantity, Timestamp, TraderId,
};

/// Kind of order lifecycle event reported by the venue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    /// Order accepted and resting
    New,
    /// Order pulled by the trader
    Cancel,
    /// Price and/or quantity amended
    Modify,
    /// (Partial) execution
    Fill,
}

impl EventType {
    /// Case-insensitive parse of the wire name
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NEW" => Some(EventType::New),
            "CANCEL" | "CANCELLED" | "CANCELED" => Some(EventType::Cancel),
            "MODIFY" | "AMEND" => Some(EventType::Modify),
            "FILL" | "EXECUTION" | "TRADE" => Some(EventType::Fill),
            _ => None,
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventType::New => "NEW",
            EventType::Cancel => "CANCEL",
            EventType::Modify => "MODIFY",
            EventType::Fill => "FILL",
        };
        f.write_str(name)
    }
}

/// Canonical, validated trading event.
///
/// Created once by the normalizer and never mutated afterwards. Downstream
/// components share it behind an `Arc` instead of copying it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeEvent {
    pub event_id: EventId,
    pub feed_id: FeedId,
    pub timestamp: Timestamp,
    pub trader_id: TraderId,
    pub account_id: AccountId,
    pub instrument_id: InstrumentId,
    pub side: Side,
    pub price: Price,
    pub quantity: Quantity,
    pub order_id: OrderId,
    pub event_type: EventType,
    /// Other side of an execution, when the venue reports it
    pub counterparty_id: Option<TraderId>,
}

impl TradeEvent {
    /// Window this event belongs to
    pub fn window_key(&self) -> WindowKey {
        WindowKey::new(self.trader_id.clone(), self.instrument_id.clone())
    }

    /// price * quantity
    pub fn notional(&self) -> Decimal {
        self.price * self.quantity
    }

    pub fn is_fill(&self) -> bool {
        self.event_type == EventType::Fill
    }
}
