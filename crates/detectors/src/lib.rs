//! Sentinel Pattern Detectors
//!
//! Four misconduct detectors over the entity graph and event windows:
//!
//! | Detector | Triggered by | Looks for |
//! |----------|--------------|-----------|
//! | Spoofing | CANCEL | large order pulled quickly right after an opposite-side trade |
//! | Wash trading | FILL with counterparty | bought ≈ sold against a related counterparty |
//! | Layering | CANCEL | multi-level one-sided book, opposite execution, mass cancel |
//! | Front-running | FILL | order ahead of a connected trader's large order, closed after it |
//!
//! Detectors only read state (`GraphView`, `WindowView`) and reason purely on
//! event timestamps, so replaying the same events yields the same findings.

mod config;
mod detector;
pub mod front_running;
pub mod layering;
pub mod spoofing;
mod util;
pub mod wash_trading;

pub use config::{
    DetectorsConfig, FrontRunningConfig, LayeringConfig, SpoofingConfig, WashTradingConfig,
};
pub use detector::{Detector, DetectorSet};
pub use front_running::FrontRunningDetector;
pub use layering::LayeringDetector;
pub use spoofing::SpoofingDetector;
pub use wash_trading::WashTradingDetector;
