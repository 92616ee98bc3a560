//! Sentinel Alert Aggregator
//!
//! Turns the stream of detector findings into deduplicated, scored alerts and
//! owns their lifecycle:
//!
//! ```text
//! NEW ──► UNDER_REVIEW ──► CONFIRMED
//!                     └──► DISMISSED
//! ```
//!
//! Open alerts (NEW, UNDER_REVIEW) absorb corroborating findings; severity
//! only ever goes up.

mod aggregator;
mod error;
mod policy;
mod query;

pub use aggregator::{AlertAggregator, AlertStats, IngestOutcome};
pub use error::{AlertError, AlertResult};
pub use policy::{AlertsConfig, MergePolicy, SeverityPolicy};
pub use query::AlertQuery;
