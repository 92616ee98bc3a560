use parking_lot::RwLock;
use sentinel_core::Timestamp;
use sentinel_ports::Clock;
use std::sync::Arc;

/// Clock driven by the event stream itself
///
/// Reports the highest event timestamp observed. Before the first event it
/// falls back to the supplied origin. Replays use this so that retention and
/// alert timestamps line up with the data rather than with wall time.
pub struct StreamClock {
    latest: RwLock<Timestamp>,
}

impl StreamClock {
    pub fn new(origin: Timestamp) -> Arc<Self> {
        Arc::new(Self {
            latest: RwLock::new(origin),
        })
    }

    /// Record an observed event time; older times are ignored
    pub fn observe(&self, at: Timestamp) {
        let mut latest = self.latest.write();
        if at > *latest {
            *latest = at;
        }
    }
}

impl Clock for StreamClock {
    fn now(&self) -> Timestamp {
        *self.latest.read()
    }

    fn name(&self) -> &str {
        "stream"
    }
}
