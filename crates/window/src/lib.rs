//! Sentinel Window Manager
//!
//! Time-ordered, bounded event buffers keyed by (trader, instrument). Every
//! time-sensitive detector reads its evidence from here through `WindowView`.

mod config;
mod manager;

pub use config::WindowConfig;
pub use manager::{WindowHold, WindowManager, WindowSnapshot, WindowStats};
