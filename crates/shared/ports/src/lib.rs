//! Sentinel Ports
//!
//! Port definitions (traits) for the Sentinel surveillance core.
//! These define the boundaries between detection logic and infrastructure:
//! detectors see state only through `GraphView` and `WindowView`, alerts leave
//! through an `AlertSink`.

mod clock;
mod error;
mod graph;
mod sink;
mod window;

pub use clock::Clock;
pub use error::{DispatchError, DispatchResult};
pub use graph::GraphView;
pub use sink::{AlertEventKind, AlertSink, DeliveryFailure};
pub use window::WindowView;
