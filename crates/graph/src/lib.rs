//! Sentinel Entity Graph
//!
//! In-memory, incrementally maintained graph of traders, accounts and
//! instruments, plus the order projections built from the event stream.
//! Shared substrate every detector reads through `GraphView`.
//!
//! ```text
//!        TRADED                 CO_LOCATED_WITH
//! instrument ◄──────── trader ──────────────────► account
//!                        │
//!                        │ COUNTERPARTY_OF (fills)
//!                        ▼
//!                      trader
//! ```
//!
//! Edges are stored on both endpoints and carry an aggregate weight
//! (event count, filled notional) that only grows until the edge is evicted.

mod config;
mod graph;
mod partition;
mod seen;
mod snapshot;

pub use config::GraphConfig;
pub use graph::{ApplyOutcome, EntityGraph, GraphStats};
pub use partition::EvictionStats;
pub use snapshot::{GraphSnapshot, SnapshotEdge, SnapshotNode};
