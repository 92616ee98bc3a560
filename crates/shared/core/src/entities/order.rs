use chrono::Duration;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{EventType, OrderStatus, Side, TradeEvent};
use crate::error::InvariantViolation;
use crate::values::{
    AccountId, InstrumentId, OrderId, Price, Quantity, Timestamp, TraderId,
};

/// Mutable projection of every event seen for one `order_id`.
///
/// Owned by the entity graph. The first event opens the projection; when that
/// event is not a NEW (the stream started mid-life of the order) the order is
/// marked `inferred`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: OrderId,
    pub trader_id: TraderId,
    pub account_id: AccountId,
    pub instrument_id: InstrumentId,
    pub side: Side,
    /// Current limit price (latest NEW/MODIFY)
    pub price: Price,
    /// Size as first placed
    pub original_quantity: Quantity,
    /// Current total size (after modifies)
    pub quantity: Quantity,
    pub filled_quantity: Quantity,
    pub remaining_quantity: Quantity,
    pub status: OrderStatus,
    pub first_seen: Timestamp,
    pub last_update: Timestamp,
    pub event_count: u64,
    pub inferred: bool,
}

impl Order {
    /// Open a projection from the first event observed for the order
    pub fn open(event: &TradeEvent) -> Result<Self, InvariantViolation> {
        let mut order = Self {
            order_id: event.order_id.clone(),
            trader_id: event.trader_id.clone(),
            account_id: event.account_id.clone(),
            instrument_id: event.instrument_id.clone(),
            side: event.side,
            price: event.price,
            original_quantity: event.quantity,
            quantity: event.quantity,
            filled_quantity: Decimal::ZERO,
            remaining_quantity: event.quantity,
            status: OrderStatus::Active,
            first_seen: event.timestamp,
            last_update: event.timestamp,
            event_count: 0,
            inferred: event.event_type != EventType::New,
        };

        match event.event_type {
            EventType::New | EventType::Modify => order.event_count = 1,
            // A fill for an unseen order: treat the fill size as the whole order
            EventType::Fill => order.apply(event)?,
            EventType::Cancel => {
                order.status = OrderStatus::Cancelled;
                order.event_count = 1;
            }
        }

        Ok(order)
    }

    /// Fold one more event into the projection
    pub fn apply(&mut self, event: &TradeEvent) -> Result<(), InvariantViolation> {
        if event.instrument_id != self.instrument_id {
            return Err(InvariantViolation::InstrumentMismatch {
                order_id: self.order_id.clone(),
                expected: self.instrument_id.clone(),
                got: event.instrument_id.clone(),
            });
        }

        match event.event_type {
            EventType::New | EventType::Modify => {
                if self.status.is_terminal() {
                    // Late restatement of a finished order changes nothing
                    self.touch(event.timestamp);
                    return Ok(());
                }
                if event.quantity < self.filled_quantity {
                    return Err(InvariantViolation::QuantityBelowFilled {
                        order_id: self.order_id.clone(),
                        quantity: event.quantity,
                        filled: self.filled_quantity,
                    });
                }
                self.price = event.price;
                self.quantity = event.quantity;
                self.remaining_quantity = self.quantity - self.filled_quantity;
                if self.remaining_quantity.is_zero() {
                    self.status = OrderStatus::Filled;
                }
            }
            EventType::Fill => {
                if self.status.is_terminal() && self.event_count > 0 {
                    return Err(InvariantViolation::FillAfterTerminal {
                        order_id: self.order_id.clone(),
                        status: self.status,
                    });
                }
                if event.quantity > self.remaining_quantity {
                    return Err(InvariantViolation::NegativeRemaining {
                        order_id: self.order_id.clone(),
                        remaining: self.remaining_quantity,
                        fill: event.quantity,
                    });
                }
                self.filled_quantity += event.quantity;
                self.remaining_quantity -= event.quantity;
                self.status = if self.remaining_quantity.is_zero() {
                    OrderStatus::Filled
                } else {
                    OrderStatus::PartiallyFilled
                };
            }
            EventType::Cancel => {
                if !self.status.is_terminal() {
                    self.status = OrderStatus::Cancelled;
                }
            }
        }

        self.touch(event.timestamp);
        Ok(())
    }

    fn touch(&mut self, at: Timestamp) {
        self.event_count += 1;
        if at > self.last_update {
            self.last_update = at;
        }
    }

    /// Time between first sighting and `at`
    pub fn resting_duration(&self, at: Timestamp) -> Duration {
        at - self.first_seen
    }

    /// first-seen to last-update
    pub fn lifetime(&self) -> Duration {
        self.last_update - self.first_seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn event(id: &str, event_type: EventType, qty: Decimal, secs: i64) -> TradeEvent {
        TradeEvent {
            event_id: id.to_string(),
            feed_id: "default".to_string(),
            timestamp: Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap(),
            trader_id: "A".to_string(),
            account_id: "ACC-1".to_string(),
            instrument_id: "XYZ".to_string(),
            side: Side::Buy,
            price: dec!(100),
            quantity: qty,
            order_id: "O-1".to_string(),
            event_type,
            counterparty_id: None,
        }
    }

    #[test]
    fn test_new_then_partial_then_full_fill() {
        let mut order = Order::open(&event("e1", EventType::New, dec!(100), 0)).unwrap();
        assert_eq!(order.status, OrderStatus::Active);
        assert!(!order.inferred);

        order.apply(&event("e2", EventType::Fill, dec!(40), 1)).unwrap();
        assert_eq!(order.status, OrderStatus::PartiallyFilled);
        assert_eq!(order.remaining_quantity, dec!(60));

        order.apply(&event("e3", EventType::Fill, dec!(60), 2)).unwrap();
        assert_eq!(order.status, OrderStatus::Filled);
        assert_eq!(order.remaining_quantity, Decimal::ZERO);
        assert_eq!(order.lifetime(), Duration::seconds(2));
    }

    #[test]
    fn test_overfill_is_invariant_violation() {
        let mut order = Order::open(&event("e1", EventType::New, dec!(10), 0)).unwrap();
        let err = order
            .apply(&event("e2", EventType::Fill, dec!(11), 1))
            .unwrap_err();
        assert!(matches!(err, InvariantViolation::NegativeRemaining { .. }));
        // State untouched by the rejected event
        assert_eq!(order.remaining_quantity, dec!(10));
    }

    #[test]
    fn test_fill_after_cancel_is_invariant_violation() {
        let mut order = Order::open(&event("e1", EventType::New, dec!(10), 0)).unwrap();
        order.apply(&event("e2", EventType::Cancel, dec!(0), 1)).unwrap();
        assert_eq!(order.status, OrderStatus::Cancelled);
        let err = order
            .apply(&event("e3", EventType::Fill, dec!(1), 2))
            .unwrap_err();
        assert!(matches!(err, InvariantViolation::FillAfterTerminal { .. }));
    }

    #[test]
    fn test_modify_recomputes_remaining() {
        let mut order = Order::open(&event("e1", EventType::New, dec!(100), 0)).unwrap();
        order.apply(&event("e2", EventType::Fill, dec!(30), 1)).unwrap();
        order.apply(&event("e3", EventType::Modify, dec!(50), 2)).unwrap();
        assert_eq!(order.remaining_quantity, dec!(20));
        assert_eq!(order.original_quantity, dec!(100));

        let err = order
            .apply(&event("e4", EventType::Modify, dec!(10), 3))
            .unwrap_err();
        assert!(matches!(err, InvariantViolation::QuantityBelowFilled { .. }));
    }

    #[test]
    fn test_first_event_fill_is_inferred() {
        let order = Order::open(&event("e1", EventType::Fill, dec!(25), 0)).unwrap();
        assert!(order.inferred);
        assert_eq!(order.status, OrderStatus::Filled);
        assert_eq!(order.filled_quantity, dec!(25));
    }

    #[test]
    fn test_last_update_never_moves_backwards() {
        let mut order = Order::open(&event("e1", EventType::New, dec!(10), 5)).unwrap();
        order.apply(&event("e2", EventType::Modify, dec!(12), 3)).unwrap();
        assert_eq!(order.last_update, order.first_seen);
        assert_eq!(order.event_count, 2);
    }
}
