//! Sentinel Event Normalizer
//!
//! First stage of the surveillance pipeline. Turns loosely typed exchange
//! payloads into canonical, immutable `TradeEvent`s.
//!
//! ```text
//! bytes ──decode──► RawEvent ──normalize──► TradeEvent
//!                                  │
//!                                  └── ValidationError (dropped, logged)
//! ```

mod config;
mod normalizer;
mod raw;

pub use config::NormalizerConfig;
pub use normalizer::{Normalizer, NormalizerStats};
pub use raw::{DEFAULT_FEED, RawEvent, decode};
