use chrono::Utc;
use sentinel_core::Timestamp;
use sentinel_ports::Clock;

/// Wall time, for live feeds.
///
/// Stamps alert creation and disposition, and drives sweeps when the engine
/// is not sweeping on event time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now()
    }

    fn name(&self) -> &str {
        "system"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_reads_wall_time() {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
        let before = Utc::now();
        let now = clock.now();
        let after = Utc::now();
        assert!(before <= now && now <= after);
        assert_eq!(clock.name(), "system");
    }
}
