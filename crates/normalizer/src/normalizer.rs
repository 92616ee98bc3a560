//! Raw event -> `TradeEvent`
//!
//! Checks, in order:
//! - required identifiers present and non-empty
//! - side and event type recognised
//! - price and quantity present (CANCEL may omit both) and non-negative
//! - timestamp within the supported range and not behind the feed watermark by more than the skew tolerance
//!
//! The only state is the per-feed watermark and the counters.

use dashmap::DashMap;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicU64, Ordering};

use sentinel_core::{
    EventType, FeedId, Side, Timestamp, TradeEvent, ValidationError, saturating_sub,
};

use crate::config::NormalizerConfig;
use crate::raw::{DEFAULT_FEED, RawEvent, decode};

/// Snapshot of normalizer counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizerStats {
    pub accepted: u64,
    pub rejected: u64,
    pub out_of_order: u64,
}

pub struct Normalizer {
    config: NormalizerConfig,
    watermarks: DashMap<FeedId, Timestamp>,
    accepted: AtomicU64,
    rejected: AtomicU64,
    out_of_order: AtomicU64,
}

impl Normalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        Self {
            config,
            watermarks: DashMap::new(),
            accepted: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            out_of_order: AtomicU64::new(0),
        }
    }

    /// Validate and convert one raw event
    pub fn normalize(&self, raw: RawEvent) -> Result<TradeEvent, ValidationError> {
        let result = self.convert(raw);
        match &result {
            Ok(_) => {
                self.accepted.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                self.rejected.fetch_add(1, Ordering::Relaxed);
                if matches!(e, ValidationError::OutOfOrder { .. }) {
                    self.out_of_order.fetch_add(1, Ordering::Relaxed);
                }
                log::warn!("Rejected event: {}", e);
            }
        }
        result
    }

    /// Decode a JSON payload and normalize it
    pub fn normalize_payload(&self, payload: &[u8]) -> Result<TradeEvent, ValidationError> {
        match decode(payload) {
            Ok(raw) => self.normalize(raw),
            Err(e) => {
                self.rejected.fetch_add(1, Ordering::Relaxed);
                log::warn!("Rejected event: {}", e);
                Err(e)
            }
        }
    }

    fn convert(&self, raw: RawEvent) -> Result<TradeEvent, ValidationError> {
        let timestamp = raw.resolve_timestamp()?;
        let event_type_text = required(raw.event_type, "event_type")?;
        let event_type = EventType::parse(&event_type_text)
            .ok_or(ValidationError::UnknownEventType(event_type_text))?;
        let side_text = required(raw.side, "side")?;
        let side = parse_side(&side_text).ok_or(ValidationError::UnknownSide(side_text))?;

        let event_id = required(raw.event_id, "event_id")?;
        let order_id = required(raw.order_id, "order_id")?;
        let trader_id = required(raw.trader_id, "trader_id")?;
        let account_id = required(raw.account_id, "account_id")?;
        let instrument_id = required(raw.instrument_id, "instrument_id")?;

        let (price, quantity) = match (event_type, raw.price, raw.quantity) {
            (_, Some(price), Some(quantity)) => (price, quantity),
            (EventType::Cancel, price, quantity) => (
                price.unwrap_or(Decimal::ZERO),
                quantity.unwrap_or(Decimal::ZERO),
            ),
            (_, None, _) => return Err(ValidationError::MissingField { field: "price" }),
            (_, _, None) => return Err(ValidationError::MissingField { field: "quantity" }),
        };
        non_negative(price, "price")?;
        non_negative(quantity, "quantity")?;

        let feed_id = raw
            .feed_id
            .filter(|f| !f.is_empty())
            .unwrap_or_else(|| DEFAULT_FEED.to_string());
        self.advance_watermark(&feed_id, timestamp)?;

        Ok(TradeEvent {
            event_id,
            feed_id,
            timestamp,
            trader_id,
            account_id,
            instrument_id,
            side,
            price,
            quantity,
            order_id,
            event_type,
            counterparty_id: raw.counterparty_id.filter(|c| !c.is_empty()),
        })
    }

    /// Check the event against its feed watermark and move the watermark forward.
    /// The entry lock makes check-and-advance atomic per feed.
    fn advance_watermark(&self, feed_id: &str, timestamp: Timestamp) -> Result<(), ValidationError> {
        let mut watermark = self
            .watermarks
            .entry(feed_id.to_string())
            .or_insert(timestamp);
        if timestamp < saturating_sub(*watermark, self.config.skew_tolerance()) {
            return Err(ValidationError::OutOfOrder {
                feed_id: feed_id.to_string(),
                timestamp,
                watermark: *watermark,
            });
        }
        if timestamp > *watermark {
            *watermark = timestamp;
        }
        Ok(())
    }

    /// Highest timestamp accepted on a feed
    pub fn watermark(&self, feed_id: &str) -> Option<Timestamp> {
        self.watermarks.get(feed_id).map(|w| *w)
    }

    pub fn stats(&self) -> NormalizerStats {
        NormalizerStats {
            accepted: self.accepted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            out_of_order: self.out_of_order.load(Ordering::Relaxed),
        }
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(NormalizerConfig::default())
    }
}

fn required(value: Option<String>, field: &'static str) -> Result<String, ValidationError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ValidationError::MissingField { field }),
    }
}

fn non_negative(value: Decimal, field: &'static str) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ValidationError::Negative {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

fn parse_side(s: &str) -> Option<Side> {
    match s.trim().to_ascii_uppercase().as_str() {
        "BUY" | "B" | "BID" => Some(Side::Buy),
        "SELL" | "S" | "ASK" => Some(Side::Sell),
        _ => None,
    }
}
