//! Closed set of detectors sharing one `evaluate` contract

use sentinel_core::{Finding, PatternType, TradeEvent};
use sentinel_ports::{GraphView, WindowView};

use crate::config::DetectorsConfig;
use crate::front_running::{self, FrontRunningDetector};
use crate::layering::{self, LayeringDetector};
use crate::spoofing::{self, SpoofingDetector};
use crate::wash_trading::{self, WashTradingDetector};

/// A pattern detector.
///
/// Evaluation reads graph and window state through the views and never
/// mutates anything; the same inputs always give the same findings.
#[derive(Debug, Clone)]
pub enum Detector {
    Spoofing(SpoofingDetector),
    WashTrading(WashTradingDetector),
    Layering(LayeringDetector),
    FrontRunning(FrontRunningDetector),
}

impl Detector {
    pub fn name(&self) -> &'static str {
        match self {
            Detector::Spoofing(_) => spoofing::NAME,
            Detector::WashTrading(_) => wash_trading::NAME,
            Detector::Layering(_) => layering::NAME,
            Detector::FrontRunning(_) => front_running::NAME,
        }
    }

    pub fn pattern(&self) -> PatternType {
        match self {
            Detector::Spoofing(_) => PatternType::Spoofing,
            Detector::WashTrading(_) => PatternType::WashTrading,
            Detector::Layering(_) => PatternType::Layering,
            Detector::FrontRunning(_) => PatternType::FrontRunning,
        }
    }

    pub fn evaluate(
        &self,
        event: &TradeEvent,
        graph: &dyn GraphView,
        windows: &dyn WindowView,
    ) -> Vec<Finding> {
        match self {
            Detector::Spoofing(d) => d.evaluate(event, graph, windows),
            Detector::WashTrading(d) => d.evaluate(event, graph, windows),
            Detector::Layering(d) => d.evaluate(event, graph, windows),
            Detector::FrontRunning(d) => d.evaluate(event, graph, windows),
        }
    }
}

/// The enabled detectors, in a fixed evaluation order
#[derive(Debug, Clone)]
pub struct DetectorSet {
    detectors: Vec<Detector>,
}

impl DetectorSet {
    pub fn new(config: &DetectorsConfig) -> Self {
        let mut detectors = Vec::new();
        if config.spoofing.enabled {
            detectors.push(Detector::Spoofing(SpoofingDetector::new(
                config.spoofing.clone(),
            )));
        }
        if config.wash_trading.enabled {
            detectors.push(Detector::WashTrading(WashTradingDetector::new(
                config.wash_trading.clone(),
            )));
        }
        if config.layering.enabled {
            detectors.push(Detector::Layering(LayeringDetector::new(
                config.layering.clone(),
            )));
        }
        if config.front_running.enabled {
            detectors.push(Detector::FrontRunning(FrontRunningDetector::new(
                config.front_running.clone(),
            )));
        }
        Self { detectors }
    }

    pub fn detectors(&self) -> &[Detector] {
        &self.detectors
    }

    pub fn len(&self) -> usize {
        self.detectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detectors.is_empty()
    }

    /// Run every detector against one event
    pub fn evaluate(
        &self,
        event: &TradeEvent,
        graph: &dyn GraphView,
        windows: &dyn WindowView,
    ) -> Vec<Finding> {
        self.detectors
            .iter()
            .flat_map(|d| d.evaluate(event, graph, windows))
            .collect()
    }
}

impl Default for DetectorSet {
    fn default() -> Self {
        Self::new(&DetectorsConfig::default())
    }
}
