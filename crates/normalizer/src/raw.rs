//! Raw wire record as delivered by exchange feeds

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use sentinel_core::{Timestamp, ValidationError, is_supported_event_time};

/// Feed id assumed when the payload names none
pub const DEFAULT_FEED: &str = "default";

/// Unvalidated exchange event.
///
/// Every field is optional so that a missing field is reported by the
/// normalizer as a `ValidationError` instead of a decode failure. Prices and
/// quantities accept JSON numbers or strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feed_id: Option<String>,
    /// RFC 3339
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    /// Epoch milliseconds, used when `timestamp` is absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_ms: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trader_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instrument_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counterparty_id: Option<String>,
}

impl RawEvent {
    /// Resolve the event time from whichever timestamp field is present
    ///
    /// Times before the Unix epoch or past `MAX_EVENT_YEAR` are malformed.
    pub fn resolve_timestamp(&self) -> Result<Timestamp, ValidationError> {
        let timestamp = if let Some(text) = self.timestamp.as_deref().filter(|s| !s.is_empty()) {
            DateTime::parse_from_rfc3339(text)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|e| ValidationError::Malformed(format!("timestamp {text:?}: {e}")))?
        } else {
            match self.timestamp_ms {
                Some(ms) => Utc.timestamp_millis_opt(ms).single().ok_or_else(|| {
                    ValidationError::Malformed(format!("timestamp_ms {ms} out of range"))
                })?,
                None => return Err(ValidationError::MissingField { field: "timestamp" }),
            }
        };
        if !is_supported_event_time(timestamp) {
            return Err(ValidationError::Malformed(format!(
                "timestamp {timestamp} outside supported range"
            )));
        }
        Ok(timestamp)
    }
}

/// Decode one JSON payload into a raw event
pub fn decode(payload: &[u8]) -> Result<RawEvent, ValidationError> {
    serde_json::from_slice(payload).map_err(|e| ValidationError::Malformed(e.to_string()))
}
