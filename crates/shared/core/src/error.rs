//! Error taxonomy of the surveillance core
//!
//! Per-event failures (`ValidationError`, `NotFoundError`, overload) never halt
//! the stream. An `InvariantViolation` is fatal to the partition that produced it
//! and nothing else.

use std::fmt;
use thiserror::Error;

use crate::entities::{AlertStatus, Decision, OrderStatus};
use crate::values::{FeedId, OrderId, Quantity, Timestamp};

/// Malformed or out-of-order input; the event is dropped and ingestion continues
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("Field {field} must be non-negative, got {value}")]
    Negative { field: &'static str, value: String },

    #[error(
        "Out-of-order event on feed {feed_id}: timestamp {timestamp} is behind watermark {watermark} beyond skew tolerance"
    )]
    OutOfOrder {
        feed_id: FeedId,
        timestamp: Timestamp,
        watermark: Timestamp,
    },

    #[error("Unknown event type: {0}")]
    UnknownEventType(String),

    #[error("Unknown side: {0}")]
    UnknownSide(String),

    #[error("Malformed payload: {0}")]
    Malformed(String),
}

/// Which kind of entity a lookup was for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookupKind {
    Order,
    Entity,
    Window,
    Alert,
}

impl fmt::Display for LookupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LookupKind::Order => "Order",
            LookupKind::Entity => "Entity",
            LookupKind::Window => "Window",
            LookupKind::Alert => "Alert",
        };
        f.write_str(name)
    }
}

/// Query against an evicted or unknown entity
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} not found: {id}")]
pub struct NotFoundError {
    pub kind: LookupKind,
    pub id: String,
}

impl NotFoundError {
    pub fn new(kind: LookupKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }
}

/// Internal consistency failure. Never silently corrected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error("Order {order_id}: fill of {fill} exceeds remaining quantity {remaining}")]
    NegativeRemaining {
        order_id: OrderId,
        remaining: Quantity,
        fill: Quantity,
    },

    #[error("Order {order_id}: modify to {quantity} is below filled quantity {filled}")]
    QuantityBelowFilled {
        order_id: OrderId,
        quantity: Quantity,
        filled: Quantity,
    },

    #[error("Order {order_id}: fill received in terminal status {status:?}")]
    FillAfterTerminal {
        order_id: OrderId,
        status: OrderStatus,
    },

    #[error("Order {order_id}: event for instrument {got} but order trades {expected}")]
    InstrumentMismatch {
        order_id: OrderId,
        expected: String,
        got: String,
    },
}

/// Attempted alert transition the lifecycle does not allow
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Illegal alert transition: {decision:?} from {from:?}")]
pub struct TransitionError {
    pub from: AlertStatus,
    pub decision: Decision,
}

/// Umbrella error surfaced across component boundaries
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SurveillanceError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    #[error("Ingestion overloaded: {depth} events queued, limit {limit}")]
    Overload { depth: usize, limit: usize },

    #[error("Invariant violated in partition {partition}: {violation}")]
    Invariant {
        partition: usize,
        #[source]
        violation: InvariantViolation,
    },

    #[error("Partition {partition} is quarantined pending reconstruction")]
    PartitionQuarantined { partition: usize },

    #[error("Engine is shutting down")]
    Shutdown,
}

impl SurveillanceError {
    /// True for errors that affect only the current event
    pub fn is_per_event(&self) -> bool {
        matches!(
            self,
            SurveillanceError::Validation(_)
                | SurveillanceError::NotFound(_)
                | SurveillanceError::Overload { .. }
        )
    }
}

pub type SurveillanceResult<T> = std::result::Result<T, SurveillanceError>;
