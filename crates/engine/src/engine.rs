use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use sentinel_alerts::AlertAggregator;
use sentinel_core::{
    EventId, InvariantViolation, SurveillanceError, SurveillanceResult, TradeEvent,
    ValidationError,
};
use sentinel_detectors::DetectorSet;
use sentinel_graph::EntityGraph;
use sentinel_normalizer::{Normalizer, RawEvent, decode};
use sentinel_ports::{AlertSink, Clock};
use sentinel_window::WindowManager;

use crate::admission::Admission;
use crate::config::{ConfigError, EngineConfig};
use crate::dispatch::{DispatchBoundary, Notifier};
use crate::query::QueryBoundary;
use crate::retry::ExponentialBackoff;
use crate::stats::{Counters, EngineStats};
use crate::sweeper::{SweepReport, Sweeper};
use crate::worker::{Pipeline, Worker};

/// Per-event answer of the ingestion boundary
#[derive(Debug, Clone, PartialEq)]
pub enum IngestStatus {
    Accepted(EventId),
    Rejected(ValidationError),
    /// Queue full; the caller decides whether to retry or shed
    Overloaded,
    ShuttingDown,
}

impl From<SurveillanceResult<EventId>> for IngestStatus {
    fn from(result: SurveillanceResult<EventId>) -> Self {
        match result {
            Ok(event_id) => IngestStatus::Accepted(event_id),
            Err(SurveillanceError::Validation(e)) => IngestStatus::Rejected(e),
            Err(SurveillanceError::Overload { .. }) => IngestStatus::Overloaded,
            Err(_) => IngestStatus::ShuttingDown,
        }
    }
}

/// The running surveillance core
pub struct SurveillanceEngine {
    config: EngineConfig,
    normalizer: Arc<Normalizer>,
    pipeline: Arc<Pipeline>,
    sweeper: Arc<Sweeper>,
    senders: Vec<mpsc::Sender<TradeEvent>>,
    shutdown_tx: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
    dispatch: DispatchBoundary,
    query: QueryBoundary,
}

impl SurveillanceEngine {
    /// Validate `config` and spawn workers and the sweeper on the current runtime
    pub fn start(
        config: EngineConfig,
        sink: Arc<dyn AlertSink>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let graph = Arc::new(EntityGraph::new(config.graph.clone()));
        let windows = Arc::new(WindowManager::new(config.window.clone()));
        let aggregator = Arc::new(AlertAggregator::new(config.alerts.clone()));
        let counters = Arc::new(Counters::default());
        let admission = Arc::new(Admission::new(config.pipeline.queue_depth));
        let backoff = ExponentialBackoff::from_config(&config.pipeline.retry);
        let notifier = Notifier::new(sink, backoff);

        let pipeline = Arc::new(Pipeline {
            graph: Arc::clone(&graph),
            windows: Arc::clone(&windows),
            detectors: DetectorSet::new(&config.detectors),
            aggregator: Arc::clone(&aggregator),
            notifier: notifier.clone(),
            clock: Arc::clone(&clock),
            backoff,
            admission,
            counters: Arc::clone(&counters),
        });
        let sweeper = Arc::new(Sweeper {
            graph: Arc::clone(&graph),
            windows: Arc::clone(&windows),
            aggregator: Arc::clone(&aggregator),
            clock: Arc::clone(&clock),
            use_event_time: config.pipeline.sweep_uses_event_time,
            counters,
        });

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut senders = Vec::with_capacity(config.pipeline.workers);
        let mut handles = Vec::with_capacity(config.pipeline.workers + 1);
        for id in 0..config.pipeline.workers {
            let (tx, rx) = mpsc::channel(config.pipeline.queue_depth);
            let worker = Worker::new(id, Arc::clone(&pipeline), rx, shutdown_rx.clone());
            handles.push(tokio::spawn(worker.run()));
            senders.push(tx);
        }

        let every = config
            .pipeline
            .sweep_interval()
            .to_std()
            .unwrap_or(std::time::Duration::from_secs(1));
        handles.push(tokio::spawn(Sweeper::clone(&sweeper).run(every, shutdown_rx)));

        log::info!(
            "Surveillance engine started: {} workers, queue depth {}, {} detectors, {} graph partitions, {} clock",
            config.pipeline.workers,
            config.pipeline.queue_depth,
            pipeline.detectors.len(),
            graph.partition_count(),
            clock.name()
        );

        Ok(Self {
            normalizer: Arc::new(Normalizer::new(config.normalizer.clone())),
            dispatch: DispatchBoundary::new(Arc::clone(&aggregator), notifier, clock),
            query: QueryBoundary::new(graph, windows, aggregator),
            config,
            pipeline,
            sweeper,
            senders,
            shutdown_tx,
            handles,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn dispatch(&self) -> &DispatchBoundary {
        &self.dispatch
    }

    pub fn query(&self) -> &QueryBoundary {
        &self.query
    }

    fn counters(&self) -> &Counters {
        &self.pipeline.counters
    }

    fn route(&self, order_id: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        order_id.hash(&mut hasher);
        (hasher.finish() as usize) % self.senders.len()
    }

    /// Normalize one raw event and queue it for processing
    pub fn submit(&self, raw: RawEvent) -> SurveillanceResult<EventId> {
        if *self.shutdown_tx.borrow() {
            return Err(SurveillanceError::Shutdown);
        }

        let admission = &self.pipeline.admission;
        if let Err(depth) = admission.try_acquire() {
            Counters::inc(&self.counters().overloaded);
            log::warn!(
                "Ingestion overloaded ({} queued, limit {}); event refused",
                depth,
                admission.limit()
            );
            return Err(SurveillanceError::Overload {
                depth,
                limit: admission.limit(),
            });
        }

        let event = match self.normalizer.normalize(raw) {
            Ok(event) => event,
            Err(e) => {
                admission.release();
                Counters::inc(&self.counters().rejected);
                return Err(e.into());
            }
        };

        let event_id = event.event_id.clone();
        let worker = self.route(&event.order_id);
        if self.senders[worker].try_send(event).is_err() {
            admission.release();
            return Err(SurveillanceError::Shutdown);
        }
        Counters::inc(&self.counters().accepted);
        Ok(event_id)
    }

    /// Decode a JSON payload and submit it
    pub fn submit_payload(&self, payload: &[u8]) -> SurveillanceResult<EventId> {
        match decode(payload) {
            Ok(raw) => self.submit(raw),
            Err(e) => {
                Counters::inc(&self.counters().rejected);
                log::warn!("Rejected payload: {}", e);
                Err(e.into())
            }
        }
    }

    pub fn ingest_batch(&self, batch: impl IntoIterator<Item = RawEvent>) -> Vec<IngestStatus> {
        batch
            .into_iter()
            .map(|raw| IngestStatus::from(self.submit(raw)))
            .collect()
    }

    /// Wait until every accepted event has been processed
    pub async fn drain(&self) {
        self.pipeline.admission.wait_idle().await;
    }

    /// Run one eviction sweep now
    pub fn sweep_now(&self) -> Option<SweepReport> {
        self.sweeper.sweep()
    }

    pub fn quarantined_partitions(&self) -> Vec<(usize, InvariantViolation)> {
        self.pipeline.graph.quarantined_partitions()
    }

    /// Clear a quarantined graph partition; the caller replays its events
    pub fn reset_partition(&self, index: usize) -> Option<InvariantViolation> {
        self.pipeline.graph.reset_partition(index)
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            in_flight: self.pipeline.admission.in_flight(),
            normalizer: self.normalizer.stats(),
            graph: self.pipeline.graph.stats(),
            windows: self.pipeline.windows.stats(),
            alerts: self.pipeline.aggregator.stats(),
            ..EngineStats::from_counters(self.counters())
        }
    }

    /// Stop workers and the sweeper. Queued events are dropped and findings
    /// still being evaluated are discarded.
    pub async fn shutdown(self) {
        log::info!("Surveillance engine shutting down");
        self.shutdown_tx.send_replace(true);
        drop(self.senders);
        for handle in self.handles {
            if let Err(e) = handle.await {
                log::error!("Engine task failed: {}", e);
            }
        }
        log::info!("Surveillance engine stopped");
    }
}
