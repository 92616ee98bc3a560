use chrono::{DateTime, Datelike, Duration, Utc};
use rust_decimal::Decimal;

/// Price value - uses Decimal for precision
pub type Price = Decimal;

/// Quantity value - uses Decimal for precision
pub type Quantity = Decimal;

/// Timestamp in UTC
pub type Timestamp = DateTime<Utc>;

/// Exchange-assigned identifier of a single raw event
pub type EventId = String;

/// Exchange-assigned order identifier, shared by every event of one order
pub type OrderId = String;

/// Trader (natural person or desk) identifier
pub type TraderId = String;

/// Account identifier
pub type AccountId = String;

/// Tradeable instrument identifier
pub type InstrumentId = String;

/// Source feed identifier, used for per-feed timestamp monotonicity
pub type FeedId = String;

/// Latest calendar year an event may carry
pub const MAX_EVENT_YEAR: i32 = 9999;

/// Whether an event timestamp lies in the range the core can reason about:
/// from the Unix epoch through the end of `MAX_EVENT_YEAR`
pub fn is_supported_event_time(ts: Timestamp) -> bool {
    ts >= DateTime::<Utc>::UNIX_EPOCH && ts.year() <= MAX_EVENT_YEAR
}

/// `at - span`, clamped to the representable range instead of overflowing
pub fn saturating_sub(at: Timestamp, span: Duration) -> Timestamp {
    at.checked_sub_signed(span).unwrap_or(if span < Duration::zero() {
        DateTime::<Utc>::MAX_UTC
    } else {
        DateTime::<Utc>::MIN_UTC
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_saturating_sub_clamps_at_the_minimum() {
        let near_min = DateTime::<Utc>::MIN_UTC + Duration::seconds(1);
        assert_eq!(
            saturating_sub(near_min, Duration::days(30)),
            DateTime::<Utc>::MIN_UTC
        );
        let t = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        assert_eq!(saturating_sub(t, Duration::seconds(10)).timestamp(), 1_699_999_990);
    }

    #[test]
    fn test_supported_event_time_bounds() {
        assert!(is_supported_event_time(DateTime::<Utc>::UNIX_EPOCH));
        assert!(is_supported_event_time(Utc.timestamp_opt(1_700_000_000, 0).unwrap()));
        assert!(!is_supported_event_time(DateTime::<Utc>::UNIX_EPOCH - Duration::milliseconds(1)));
        assert!(!is_supported_event_time(DateTime::<Utc>::MIN_UTC));
        assert!(!is_supported_event_time(DateTime::<Utc>::MAX_UTC));
    }
}
