use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::values::Timestamp;

/// Kind of node in the entity graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityKind {
    Trader,
    Account,
    Instrument,
}

/// Typed reference to a graph node
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: String,
}

impl EntityRef {
    pub fn new(kind: EntityKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    pub fn trader(id: impl Into<String>) -> Self {
        Self::new(EntityKind::Trader, id)
    }

    pub fn account(id: impl Into<String>) -> Self {
        Self::new(EntityKind::Account, id)
    }

    pub fn instrument(id: impl Into<String>) -> Self {
        Self::new(EntityKind::Instrument, id)
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            EntityKind::Trader => "trader",
            EntityKind::Account => "account",
            EntityKind::Instrument => "instrument",
        };
        write!(f, "{}:{}", kind, self.id)
    }
}

/// Edge type between two entities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Relation {
    /// trader <-> instrument
    Traded,
    /// trader <-> trader, from executions naming a counterparty
    CounterpartyOf,
    /// trader <-> account; traders sharing an account are co-located through it
    CoLocatedWith,
}

/// Aggregate carried by an edge.
///
/// Both fields only grow while the edge lives; eviction drops the whole edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EdgeWeight {
    pub event_count: u64,
    pub notional: Decimal,
}

impl EdgeWeight {
    pub fn record(&mut self, notional: Decimal) {
        self.event_count += 1;
        self.notional += notional;
    }
}

/// Edge as seen from one endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub relation: Relation,
    pub target: EntityRef,
    pub weight: EdgeWeight,
    pub first_seen: Timestamp,
    pub last_seen: Timestamp,
}
