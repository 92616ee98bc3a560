use sentinel_core::Timestamp;

/// Source of "now" outside the event stream.
///
/// Detectors never read it; they reason on event timestamps. The engine uses
/// it to stamp alert creation and review decisions, and to pick the sweep
/// cutoff when sweeping on wall time.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;

    /// Label for the startup log
    fn name(&self) -> &str {
        "clock"
    }
}
