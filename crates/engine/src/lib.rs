//! Sentinel Surveillance Engine
//!
//! Wires the detection core into a running pipeline:
//!
//! ```text
//!   raw events ──► Normalizer ──► admission (queue_depth) ──► workers
//!                                                               │
//!        ┌──────────────────────────────────────────────────────┘
//!        ▼
//!   Entity Graph ─► Window Manager ─► Detectors ─► Alert Aggregator ─► AlertSink
//!        ▲                 ▲                              ▲
//!        └──── Sweeper ────┘                              │
//!                                            DispatchBoundary::dispose_alert
//! ```
//!
//! - Ingestion: `submit`, `submit_payload`, `ingest_batch`
//! - Dispatch: `AlertSink` push callbacks plus `DispatchBoundary`
//! - Query: `QueryBoundary` point-in-time snapshots

mod admission;
pub mod config;
pub mod dispatch;
mod engine;
pub mod query;
pub mod retry;
mod stats;
mod sweeper;
mod worker;

pub use config::{ConfigError, EngineConfig, PipelineConfig, RetryConfig};
pub use dispatch::{AlertNotification, BroadcastAlertSink, DispatchBoundary, LogAlertSink};
pub use engine::{IngestStatus, SurveillanceEngine};
pub use query::QueryBoundary;
pub use retry::{ExponentialBackoff, RetriesExhausted};
pub use stats::EngineStats;
pub use sweeper::SweepReport;
