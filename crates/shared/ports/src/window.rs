use chrono::Duration;
use std::sync::Arc;

use sentinel_core::{InstrumentId, Timestamp, TradeEvent, WindowKey};

/// Read-only view of the sliding event windows offered to detectors
///
/// Sequences are chronological; events with equal timestamps keep arrival order.
pub trait WindowView: Send + Sync {
    /// Events of one (trader, instrument) window no older than `lookback`
    /// before the watermark
    fn events_in(&self, key: &WindowKey, lookback: Duration) -> Vec<Arc<TradeEvent>>;

    /// Events of one window with `at - lookback <= timestamp <= at`
    fn events_at(&self, key: &WindowKey, lookback: Duration, at: Timestamp)
    -> Vec<Arc<TradeEvent>>;

    /// Events of every trader on `instrument` with `at - lookback <= timestamp <= at`
    fn instrument_events(
        &self,
        instrument: &InstrumentId,
        lookback: Duration,
        at: Timestamp,
    ) -> Vec<Arc<TradeEvent>>;

    /// Highest event timestamp recorded so far
    fn watermark(&self) -> Option<Timestamp>;
}
