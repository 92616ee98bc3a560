mod alert;
mod event;
mod finding;
mod graph;
mod order;
mod order_status;
mod side;

pub use alert::{
    Alert, AlertId, AlertSeverity, AlertStatus, Decision, Disposition, ReviewEntry,
};
pub use event::{EventType, TradeEvent};
pub use finding::{EvidenceWindow, Finding, FindingId, PatternType, WindowKey};
pub use graph::{Edge, EdgeWeight, EntityKind, EntityRef, Relation};
pub use order::Order;
pub use order_status::OrderStatus;
pub use side::Side;
