use async_trait::async_trait;
use sentinel_core::{Alert, Finding};

use crate::error::DispatchError;

/// Which alert callback a delivery was for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertEventKind {
    Created,
    Updated,
}

/// Something that could not be delivered after all retries
#[derive(Debug, Clone)]
pub enum DeliveryFailure {
    /// The aggregator never accepted the finding, so no alert exists for it
    Finding {
        finding: Finding,
        attempts: u32,
        reason: String,
    },
    /// The alert is stored but the sink did not take the notification
    Alert {
        alert: Alert,
        kind: AlertEventKind,
        attempts: u32,
        error: DispatchError,
    },
}

impl DeliveryFailure {
    pub fn attempts(&self) -> u32 {
        match self {
            DeliveryFailure::Finding { attempts, .. } | DeliveryFailure::Alert { attempts, .. } => {
                *attempts
            }
        }
    }
}

/// Port for downstream alert consumers
///
/// Called with fully formed alert snapshots; implementations must not assume
/// they are invoked from any particular task.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn on_alert_created(&self, alert: &Alert) -> Result<(), DispatchError>;

    async fn on_alert_updated(&self, alert: &Alert) -> Result<(), DispatchError>;

    /// Retries exhausted
    async fn on_delivery_failure(&self, failure: &DeliveryFailure);
}
