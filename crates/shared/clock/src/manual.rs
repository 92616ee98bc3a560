use chrono::Duration;
use parking_lot::RwLock;
use sentinel_core::Timestamp;
use sentinel_ports::Clock;
use std::sync::Arc;

/// Frozen clock that only moves when told to
///
/// Used by tests and by historical replays that stamp alerts with a fixed
/// reference time.
pub struct ManualClock {
    current: RwLock<Timestamp>,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Arc<Self> {
        Arc::new(Self {
            current: RwLock::new(start),
        })
    }

    /// Move time forward; negative durations are ignored
    pub fn advance(&self, by: Duration) {
        if by > Duration::zero() {
            *self.current.write() += by;
        }
    }

    /// Jump to `time`. May move backwards.
    pub fn set(&self, time: Timestamp) {
        *self.current.write() = time;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.current.read()
    }

    fn name(&self) -> &str {
        "manual"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_manual_clock_is_frozen_until_advanced() {
        let start = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let clock = ManualClock::new(start);
        assert_eq!(clock.now(), start);

        clock.advance(Duration::seconds(5));
        assert_eq!(clock.now() - start, Duration::seconds(5));

        clock.advance(Duration::seconds(-3));
        assert_eq!(clock.now() - start, Duration::seconds(5));

        clock.set(start);
        assert_eq!(clock.now(), start);
    }
}
