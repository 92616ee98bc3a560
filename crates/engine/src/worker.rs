//! Pipeline workers
//!
//! ```text
//! submit ──hash(order_id)──► worker N ──► graph.apply_event
//!                                          │ Applied
//!                                          ▼
//!                                        windows.record
//!                                          │
//!                                          ▼
//!                                        detectors.evaluate (no awaits)
//!                                          │ findings
//!                                          ▼
//!                                        aggregator.ingest ──► sink
//! ```
//!
//! One worker owns every event of a given order, so an order's events are
//! processed in arrival order.

use std::sync::Arc;
use tokio::sync::{mpsc, watch};

use sentinel_alerts::{AlertAggregator, AlertError, IngestOutcome};
use sentinel_core::{Finding, SurveillanceError, TradeEvent};
use sentinel_detectors::DetectorSet;
use sentinel_graph::{ApplyOutcome, EntityGraph};
use sentinel_ports::{AlertEventKind, Clock, DeliveryFailure};
use sentinel_window::WindowManager;

use crate::admission::Admission;
use crate::dispatch::Notifier;
use crate::retry::ExponentialBackoff;
use crate::stats::Counters;

/// State shared by every worker
pub(crate) struct Pipeline {
    pub graph: Arc<EntityGraph>,
    pub windows: Arc<WindowManager>,
    pub detectors: DetectorSet,
    pub aggregator: Arc<AlertAggregator>,
    pub notifier: Notifier,
    pub clock: Arc<dyn Clock>,
    pub backoff: ExponentialBackoff,
    pub admission: Arc<Admission>,
    pub counters: Arc<Counters>,
}

impl Pipeline {
    async fn process(&self, event: TradeEvent, shutdown: &watch::Receiver<bool>) {
        let event = Arc::new(event);

        match self.graph.apply_event(&event) {
            Ok(ApplyOutcome::Applied) => {}
            Ok(ApplyOutcome::Duplicate) => {
                Counters::inc(&self.counters.duplicates);
                return;
            }
            Err(err @ SurveillanceError::Invariant { .. }) => {
                Counters::inc(&self.counters.invariant_violations);
                log::error!("Event {} dropped: {}", event.event_id, err);
                return;
            }
            Err(err) => {
                Counters::inc(&self.counters.quarantined_drops);
                log::warn!("Event {} dropped: {}", event.event_id, err);
                return;
            }
        }

        self.windows.record(Arc::clone(&event));

        let findings = {
            let _hold = self.windows.hold(&event.window_key());
            self.detectors
                .evaluate(&event, &*self.graph, &*self.windows)
        };
        Counters::inc(&self.counters.processed);

        if findings.is_empty() {
            return;
        }
        if *shutdown.borrow() {
            Counters::add(&self.counters.discarded_findings, findings.len());
            log::info!(
                "Discarding {} findings for event {} during shutdown",
                findings.len(),
                event.event_id
            );
            return;
        }

        Counters::add(&self.counters.findings, findings.len());
        for finding in findings {
            self.deliver(finding).await;
        }
    }

    async fn deliver(&self, finding: Finding) {
        let now = self.clock.now();
        let result = self
            .backoff
            .run("Alert ingest", AlertError::is_retryable, || async {
                self.aggregator.ingest(&finding, now)
            })
            .await;

        let delivered = match result {
            Ok(IngestOutcome::Created(alert)) => {
                Counters::inc(&self.counters.alerts_created);
                self.notifier.notify(AlertEventKind::Created, &alert).await
            }
            Ok(IngestOutcome::Merged(alert)) => {
                Counters::inc(&self.counters.alerts_merged);
                self.notifier.notify(AlertEventKind::Updated, &alert).await
            }
            Ok(IngestOutcome::Duplicate(_)) => true,
            Err(exhausted) => {
                log::error!(
                    "Finding {} ({}) not ingested after {} attempts: {}",
                    finding.finding_id,
                    finding.pattern_type,
                    exhausted.attempts,
                    exhausted.error
                );
                let failure = DeliveryFailure::Finding {
                    reason: exhausted.error.to_string(),
                    attempts: exhausted.attempts,
                    finding,
                };
                self.notifier.sink().on_delivery_failure(&failure).await;
                false
            }
        };
        if !delivered {
            Counters::inc(&self.counters.delivery_failures);
        }
    }
}

pub(crate) struct Worker {
    id: usize,
    pipeline: Arc<Pipeline>,
    rx: mpsc::Receiver<TradeEvent>,
    shutdown: watch::Receiver<bool>,
}

impl Worker {
    pub fn new(
        id: usize,
        pipeline: Arc<Pipeline>,
        rx: mpsc::Receiver<TradeEvent>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            id,
            pipeline,
            rx,
            shutdown,
        }
    }

    pub async fn run(mut self) {
        log::info!("Worker {} started", self.id);
        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.changed() => break,
                next = self.rx.recv() => match next {
                    Some(event) => {
                        self.pipeline.process(event, &self.shutdown).await;
                        self.pipeline.admission.release();
                    }
                    None => break,
                },
            }
        }

        self.rx.close();
        let mut dropped = 0;
        while self.rx.try_recv().is_ok() {
            self.pipeline.admission.release();
            dropped += 1;
        }
        log::info!("Worker {} stopped ({} queued events dropped)", self.id, dropped);
    }
}
