//! Detector thresholds
//!
//! Every threshold and weight the algorithms use lives here. The defaults are
//! a reasonable starting point for a deployment to tune, nothing more.

use chrono::Duration;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

fn millis(ms: i64) -> Duration {
    Duration::milliseconds(ms)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpoofingConfig {
    pub enabled: bool,
    /// How far back the window is searched for the order and the opposite trade
    pub lookback_ms: i64,
    /// Cancels of orders that rested at least this long are not suspicious
    pub min_resting_ms: i64,
    /// Cancel must follow the opposite-side trade within this latency
    pub cancel_latency_ms: i64,
    /// Absolute size floor for the cancelled order
    pub min_order_quantity: Decimal,
    /// Cancelled size / average order size in window must reach this
    pub min_size_ratio: f64,
    /// Size ratio at which the size component of confidence saturates
    pub size_saturation: f64,
    /// Trade price must beat the cancelled order's price by more than this
    pub min_price_improvement: Decimal,
    pub size_weight: f64,
    pub resting_weight: f64,
    pub min_confidence: f64,
}

impl Default for SpoofingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            lookback_ms: 60_000,
            min_resting_ms: 5_000,
            cancel_latency_ms: 1_000,
            min_order_quantity: Decimal::ZERO,
            min_size_ratio: 1.5,
            size_saturation: 4.0,
            min_price_improvement: Decimal::ZERO,
            size_weight: 0.5,
            resting_weight: 0.5,
            min_confidence: 0.3,
        }
    }
}

impl SpoofingConfig {
    pub fn lookback(&self) -> Duration {
        millis(self.lookback_ms)
    }

    pub fn min_resting(&self) -> Duration {
        millis(self.min_resting_ms)
    }

    pub fn cancel_latency(&self) -> Duration {
        millis(self.cancel_latency_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WashTradingConfig {
    pub enabled: bool,
    pub lookback_ms: i64,
    /// Maximum |bought - sold| / max(bought, sold) counted as no net change
    pub epsilon: f64,
    /// Minimum matched volume against the counterparty
    pub min_matched_quantity: Decimal,
    /// Minimum COUNTERPARTY_OF edge event count between the two traders
    pub min_edge_events: u64,
    /// Edge event count at which the relationship component saturates
    pub edge_saturation: u64,
    pub balance_weight: f64,
    pub relationship_weight: f64,
    pub min_confidence: f64,
}

impl Default for WashTradingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            lookback_ms: 60_000,
            epsilon: 0.05,
            min_matched_quantity: Decimal::ONE,
            min_edge_events: 2,
            edge_saturation: 10,
            balance_weight: 0.6,
            relationship_weight: 0.4,
            min_confidence: 0.3,
        }
    }
}

impl WashTradingConfig {
    pub fn lookback(&self) -> Duration {
        millis(self.lookback_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayeringConfig {
    pub enabled: bool,
    pub lookback_ms: i64,
    /// Distinct price levels resting at the time of the opposite execution
    pub min_layers: usize,
    /// Cancels count towards the layer only within this long after the execution
    pub cancel_window_ms: i64,
    /// Fraction of the layer that must be cancelled
    pub min_cancel_ratio: f64,
    /// Level count at which the depth component saturates
    pub layer_saturation: usize,
    pub depth_weight: f64,
    pub cancel_weight: f64,
    pub min_confidence: f64,
}

impl Default for LayeringConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            lookback_ms: 30_000,
            min_layers: 3,
            cancel_window_ms: 2_000,
            min_cancel_ratio: 0.75,
            layer_saturation: 6,
            depth_weight: 0.5,
            cancel_weight: 0.5,
            min_confidence: 0.3,
        }
    }
}

impl LayeringConfig {
    pub fn lookback(&self) -> Duration {
        millis(self.lookback_ms)
    }

    pub fn cancel_window(&self) -> Duration {
        millis(self.cancel_window_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrontRunningConfig {
    pub enabled: bool,
    pub lookback_ms: i64,
    /// δ: the large order must arrive within this after the leading order
    pub lead_window_ms: i64,
    /// Size from which the connected trader's order counts as large
    pub min_large_quantity: Decimal,
    /// Leading position must be closed within this after the large order's execution
    pub close_window_ms: i64,
    /// Closed quantity / opened quantity needed to call the position closed
    pub close_fraction: f64,
    /// Graph edges older than this do not make two traders connected
    pub connection_within_ms: i64,
    /// Large / leading size ratio at which the size component saturates
    pub size_saturation: f64,
    pub timing_weight: f64,
    pub size_weight: f64,
    pub close_weight: f64,
    pub min_confidence: f64,
}

impl Default for FrontRunningConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            lookback_ms: 60_000,
            lead_window_ms: 2_000,
            min_large_quantity: dec!(1000),
            close_window_ms: 10_000,
            close_fraction: 0.8,
            connection_within_ms: 300_000,
            size_saturation: 10.0,
            timing_weight: 0.4,
            size_weight: 0.3,
            close_weight: 0.3,
            min_confidence: 0.3,
        }
    }
}

impl FrontRunningConfig {
    pub fn lookback(&self) -> Duration {
        millis(self.lookback_ms)
    }

    pub fn lead_window(&self) -> Duration {
        millis(self.lead_window_ms)
    }

    pub fn close_window(&self) -> Duration {
        millis(self.close_window_ms)
    }

    pub fn connection_within(&self) -> Duration {
        millis(self.connection_within_ms)
    }
}

/// One section per detector
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorsConfig {
    pub spoofing: SpoofingConfig,
    pub wash_trading: WashTradingConfig,
    pub layering: LayeringConfig,
    pub front_running: FrontRunningConfig,
}

impl DetectorsConfig {
    /// Longest lookback any enabled detector asks for
    pub fn max_lookback(&self) -> Duration {
        [
            (self.spoofing.enabled, self.spoofing.lookback()),
            (self.wash_trading.enabled, self.wash_trading.lookback()),
            (self.layering.enabled, self.layering.lookback()),
            (self.front_running.enabled, self.front_running.lookback()),
        ]
        .into_iter()
        .filter(|(enabled, _)| *enabled)
        .map(|(_, lookback)| lookback)
        .max()
        .unwrap_or_else(Duration::zero)
    }

    /// Problems that make the configuration unusable
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        let weights = [
            ("spoofing.size_weight", self.spoofing.size_weight),
            ("spoofing.resting_weight", self.spoofing.resting_weight),
            ("spoofing.min_confidence", self.spoofing.min_confidence),
            ("wash_trading.balance_weight", self.wash_trading.balance_weight),
            (
                "wash_trading.relationship_weight",
                self.wash_trading.relationship_weight,
            ),
            ("wash_trading.min_confidence", self.wash_trading.min_confidence),
            ("layering.depth_weight", self.layering.depth_weight),
            ("layering.cancel_weight", self.layering.cancel_weight),
            ("layering.min_cancel_ratio", self.layering.min_cancel_ratio),
            ("layering.min_confidence", self.layering.min_confidence),
            ("front_running.timing_weight", self.front_running.timing_weight),
            ("front_running.size_weight", self.front_running.size_weight),
            ("front_running.close_weight", self.front_running.close_weight),
            ("front_running.min_confidence", self.front_running.min_confidence),
        ];
        for (name, value) in weights {
            if !(0.0..=1.0).contains(&value) {
                problems.push(format!("{name} must be in [0, 1], got {value}"));
            }
        }
        if self.spoofing.size_saturation <= 0.0 {
            problems.push("spoofing.size_saturation must be positive".to_string());
        }
        if self.wash_trading.epsilon < 0.0 {
            problems.push("wash_trading.epsilon must be non-negative".to_string());
        }
        if self.layering.min_layers < 2 {
            problems.push("layering.min_layers must be at least 2".to_string());
        }
        if self.front_running.size_saturation <= 0.0 {
            problems.push("front_running.size_saturation must be positive".to_string());
        }
        let durations = [
            ("spoofing.lookback_ms", self.spoofing.lookback_ms),
            ("spoofing.min_resting_ms", self.spoofing.min_resting_ms),
            ("spoofing.cancel_latency_ms", self.spoofing.cancel_latency_ms),
            ("wash_trading.lookback_ms", self.wash_trading.lookback_ms),
            ("layering.lookback_ms", self.layering.lookback_ms),
            ("layering.cancel_window_ms", self.layering.cancel_window_ms),
            ("front_running.lookback_ms", self.front_running.lookback_ms),
            ("front_running.lead_window_ms", self.front_running.lead_window_ms),
            ("front_running.close_window_ms", self.front_running.close_window_ms),
        ];
        for (name, value) in durations {
            if value <= 0 {
                problems.push(format!("{name} must be positive, got {value}"));
            }
        }
        problems
    }
}
