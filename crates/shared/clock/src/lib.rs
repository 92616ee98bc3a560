//! Sentinel Clock Infrastructure
//!
//! Time sources for the surveillance core:
//!
//! ```text
//! SystemClock  - wall time, live feeds
//! ManualClock  - frozen, advanced explicitly (tests)
//! StreamClock  - follows the highest observed event timestamp (replays)
//! ```
//!
//! Detection never consults a clock; pattern timing comes from event
//! timestamps. Clocks stamp alerts and pace housekeeping.

mod manual;
mod stream;
mod system;

pub use manual::ManualClock;
pub use stream::StreamClock;
pub use system::SystemClock;

// Re-export the Clock trait for convenience
pub use sentinel_ports::Clock;
