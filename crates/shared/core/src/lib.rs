//! Sentinel Core Domain
//!
//! Pure domain types for the Sentinel trade surveillance core.
//! No async and no I/O.

pub mod entities;
pub mod error;
pub mod values;

// Re-export commonly used types at crate root
pub use entities::{
    // Alerts and their lifecycle
    Alert,
    AlertId,
    AlertSeverity,
    AlertStatus,
    Decision,
    Disposition,
    // Entity graph vocabulary
    Edge,
    EdgeWeight,
    EntityKind,
    EntityRef,
    // Event stream
    EventType,
    // Detector output
    EvidenceWindow,
    Finding,
    FindingId,
    Order,
    OrderStatus,
    PatternType,
    Relation,
    ReviewEntry,
    Side,
    TradeEvent,
    WindowKey,
};
pub use error::{
    InvariantViolation, LookupKind, NotFoundError, SurveillanceError, SurveillanceResult,
    TransitionError, ValidationError,
};
pub use values::{
    AccountId, EventId, FeedId, InstrumentId, MAX_EVENT_YEAR, OrderId, Price, Quantity, Timestamp,
    TraderId, is_supported_event_time, saturating_sub,
};
