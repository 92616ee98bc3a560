//! Alert Dispatch Boundary
//!
//! Push side: `AlertSink` implementations receive every created or updated
//! alert. Pull side: `DispatchBoundary::dispose_alert` is the only way an
//! alert leaves NEW or UNDER_REVIEW.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

use sentinel_alerts::{AlertAggregator, AlertError};
use sentinel_core::{Alert, AlertId, Disposition};
use sentinel_ports::{AlertEventKind, AlertSink, Clock, DeliveryFailure, DispatchError};

use crate::retry::ExponentialBackoff;

/// Message published by `BroadcastAlertSink`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AlertNotification {
    Created { alert: Alert },
    Updated { alert: Alert },
}

impl AlertNotification {
    pub fn alert(&self) -> &Alert {
        match self {
            AlertNotification::Created { alert } | AlertNotification::Updated { alert } => alert,
        }
    }

    pub fn kind(&self) -> AlertEventKind {
        match self {
            AlertNotification::Created { .. } => AlertEventKind::Created,
            AlertNotification::Updated { .. } => AlertEventKind::Updated,
        }
    }
}

/// Fans alerts out to in-process subscribers over a tokio broadcast channel
pub struct BroadcastAlertSink {
    tx: broadcast::Sender<AlertNotification>,
}

impl BroadcastAlertSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AlertNotification> {
        self.tx.subscribe()
    }

    fn publish(&self, notification: AlertNotification) -> Result<(), DispatchError> {
        self.tx
            .send(notification)
            .map(|_| ())
            .map_err(|_| DispatchError::NoSubscribers)
    }
}

#[async_trait]
impl AlertSink for BroadcastAlertSink {
    async fn on_alert_created(&self, alert: &Alert) -> Result<(), DispatchError> {
        self.publish(AlertNotification::Created {
            alert: alert.clone(),
        })
    }

    async fn on_alert_updated(&self, alert: &Alert) -> Result<(), DispatchError> {
        self.publish(AlertNotification::Updated {
            alert: alert.clone(),
        })
    }

    async fn on_delivery_failure(&self, failure: &DeliveryFailure) {
        log::error!(
            "Alert notification lost after {} attempts: {:?}",
            failure.attempts(),
            failure
        );
    }
}

/// Writes alerts to the log
#[derive(Debug, Default)]
pub struct LogAlertSink;

#[async_trait]
impl AlertSink for LogAlertSink {
    async fn on_alert_created(&self, alert: &Alert) -> Result<(), DispatchError> {
        log::info!(
            "ALERT {} {} {} traders={:?} severity={:?} ({:.2})",
            alert.alert_id,
            alert.pattern_type,
            alert.instrument_id,
            alert.trader_ids,
            alert.severity,
            alert.severity_score
        );
        Ok(())
    }

    async fn on_alert_updated(&self, alert: &Alert) -> Result<(), DispatchError> {
        log::info!(
            "ALERT {} updated: status={:?} severity={:?} findings={}",
            alert.alert_id,
            alert.status(),
            alert.severity,
            alert.evidence_count()
        );
        Ok(())
    }

    async fn on_delivery_failure(&self, failure: &DeliveryFailure) {
        log::error!("Delivery failed: {:?}", failure);
    }
}

/// Delivers alert notifications to the sink with retries
#[derive(Clone)]
pub(crate) struct Notifier {
    sink: Arc<dyn AlertSink>,
    backoff: ExponentialBackoff,
}

impl Notifier {
    pub(crate) fn new(sink: Arc<dyn AlertSink>, backoff: ExponentialBackoff) -> Self {
        Self { sink, backoff }
    }

    pub(crate) fn sink(&self) -> &Arc<dyn AlertSink> {
        &self.sink
    }

    /// Returns false when the notification could not be delivered
    pub(crate) async fn notify(&self, kind: AlertEventKind, alert: &Alert) -> bool {
        let what = format!("Delivery of alert {}", alert.alert_id);
        let result = self
            .backoff
            .run(&what, DispatchError::is_retryable, || async {
                match kind {
                    AlertEventKind::Created => self.sink.on_alert_created(alert).await,
                    AlertEventKind::Updated => self.sink.on_alert_updated(alert).await,
                }
            })
            .await;

        match result {
            Ok(()) => true,
            Err(exhausted) => {
                log::error!(
                    "Giving up on alert {} after {} attempts: {}",
                    alert.alert_id,
                    exhausted.attempts,
                    exhausted.error
                );
                self.sink
                    .on_delivery_failure(&DeliveryFailure::Alert {
                        alert: alert.clone(),
                        kind,
                        attempts: exhausted.attempts,
                        error: exhausted.error,
                    })
                    .await;
                false
            }
        }
    }
}

/// External entry point for alert dispositions
#[derive(Clone)]
pub struct DispatchBoundary {
    aggregator: Arc<AlertAggregator>,
    notifier: Notifier,
    clock: Arc<dyn Clock>,
}

impl DispatchBoundary {
    pub(crate) fn new(
        aggregator: Arc<AlertAggregator>,
        notifier: Notifier,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            aggregator,
            notifier,
            clock,
        }
    }

    /// Transition an alert; the updated alert is pushed to the sink
    pub async fn dispose_alert(
        &self,
        alert_id: AlertId,
        disposition: &Disposition,
    ) -> Result<Alert, AlertError> {
        let alert = self
            .aggregator
            .dispose(alert_id, disposition, self.clock.now())?;
        self.notifier.notify(AlertEventKind::Updated, &alert).await;
        Ok(alert)
    }
}
