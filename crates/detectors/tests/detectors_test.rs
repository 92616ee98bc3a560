//! Detector Scenario Tests
//!
//! Each scenario feeds events through a real entity graph and window manager,
//! the way the pipeline does, then evaluates one detector per event.

use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

use sentinel_core::{EventType, Finding, PatternType, Side, Timestamp, TradeEvent};
use sentinel_detectors::{
    Detector, DetectorSet, DetectorsConfig, FrontRunningConfig, FrontRunningDetector,
    LayeringConfig, LayeringDetector, SpoofingConfig, SpoofingDetector, WashTradingConfig,
    WashTradingDetector,
};
use sentinel_graph::EntityGraph;
use sentinel_window::WindowManager;

fn ts(ms: i64) -> Timestamp {
    Utc.timestamp_millis_opt(1_700_000_000_000 + ms).unwrap()
}

fn base(id: &str, trader: &str, order: &str, event_type: EventType, side: Side, ms: i64) -> TradeEvent {
    TradeEvent {
        event_id: id.to_string(),
        feed_id: "default".to_string(),
        timestamp: ts(ms),
        trader_id: trader.to_string(),
        account_id: format!("ACC-{trader}"),
        instrument_id: "XYZ".to_string(),
        side,
        price: Decimal::ZERO,
        quantity: Decimal::ZERO,
        order_id: order.to_string(),
        event_type,
        counterparty_id: None,
    }
}

fn new_order(id: &str, trader: &str, order: &str, side: Side, price: Decimal, qty: Decimal, ms: i64) -> TradeEvent {
    TradeEvent {
        price,
        quantity: qty,
        ..base(id, trader, order, EventType::New, side, ms)
    }
}

fn fill(
    id: &str,
    trader: &str,
    order: &str,
    side: Side,
    price: Decimal,
    qty: Decimal,
    ms: i64,
    counterparty: &str,
) -> TradeEvent {
    TradeEvent {
        price,
        quantity: qty,
        counterparty_id: Some(counterparty.to_string()),
        ..base(id, trader, order, EventType::Fill, side, ms)
    }
}

fn cancel(id: &str, trader: &str, order: &str, side: Side, ms: i64) -> TradeEvent {
    base(id, trader, order, EventType::Cancel, side, ms)
}

fn on_account(mut event: TradeEvent, account: &str) -> TradeEvent {
    event.account_id = account.to_string();
    event
}

/// Graph + windows fed like the pipeline feeds them
struct Harness {
    graph: EntityGraph,
    windows: WindowManager,
}

impl Harness {
    fn new() -> Self {
        Self {
            graph: EntityGraph::default(),
            windows: WindowManager::default(),
        }
    }

    /// Apply each event, evaluating the detector after each one
    fn run(&self, detector: &Detector, events: Vec<TradeEvent>) -> Vec<(String, Finding)> {
        let mut findings = Vec::new();
        for event in events {
            self.graph.apply_event(&event).unwrap();
            let event = Arc::new(event);
            self.windows.record(Arc::clone(&event));
            for finding in detector.evaluate(&event, &self.graph, &self.windows) {
                findings.push((event.event_id.clone(), finding));
            }
        }
        findings
    }
}

fn spoofing_events(cancel_at_ms: i64) -> Vec<TradeEvent> {
    vec![
        new_order("e1", "A", "O-1", Side::Buy, dec!(100), dec!(10000), 0),
        fill("e2", "A", "O-2", Side::Sell, dec!(101), dec!(100), 2_000, "MM"),
        cancel("e3", "A", "O-1", Side::Buy, cancel_at_ms),
    ]
}

#[test]
fn test_spoofing_scenario() {
    let config = SpoofingConfig::default();
    let detector = Detector::Spoofing(SpoofingDetector::new(config.clone()));
    let findings = Harness::new().run(&detector, spoofing_events(2_500));

    assert_eq!(findings.len(), 1);
    let (trigger, finding) = &findings[0];
    assert_eq!(trigger, "e3");
    assert_eq!(finding.pattern_type, PatternType::Spoofing);
    assert_eq!(finding.trader_ids, vec!["A".to_string()]);
    assert!(finding.confidence > config.min_confidence);
    assert!((finding.confidence - 0.4975).abs() < 1e-3);
    assert_eq!(finding.evidence_event_ids, vec!["e1", "e2", "e3"]);
}

#[test]
fn test_spoofing_ignores_long_resting_orders() {
    let detector = Detector::Spoofing(SpoofingDetector::new(SpoofingConfig::default()));
    // Cancel 0.5s after the trade, but the order had rested for 6s
    let mut events = spoofing_events(6_000);
    events[1].timestamp = ts(5_500);
    assert!(Harness::new().run(&detector, events).is_empty());
}

#[test]
fn test_spoofing_requires_price_improvement() {
    let detector = Detector::Spoofing(SpoofingDetector::new(SpoofingConfig::default()));
    let mut events = spoofing_events(2_500);
    events[1].price = dec!(99);
    assert!(Harness::new().run(&detector, events).is_empty());
}

#[test]
fn test_spoofing_thresholds_are_monotone() {
    let baseline = SpoofingConfig::default();
    let mut previous = usize::MAX;
    for min_size_ratio in [1.0, 1.5, 2.0, 3.0] {
        let config = SpoofingConfig {
            min_size_ratio,
            ..baseline.clone()
        };
        let detector = Detector::Spoofing(SpoofingDetector::new(config));
        let count = Harness::new().run(&detector, spoofing_events(2_500)).len();
        assert!(count <= previous);
        previous = count;
    }
    assert_eq!(previous, 0);

    let strict = Detector::Spoofing(SpoofingDetector::new(SpoofingConfig {
        min_confidence: 0.6,
        ..baseline
    }));
    assert!(Harness::new().run(&strict, spoofing_events(2_500)).is_empty());
}

fn wash_events() -> Vec<TradeEvent> {
    vec![
        fill("e1", "A", "O-1", Side::Buy, dec!(50), dec!(500), 0, "B"),
        fill("e2", "A", "O-2", Side::Sell, dec!(50), dec!(500), 1_000, "B"),
    ]
}

#[test]
fn test_wash_trading_scenario() {
    let detector = Detector::WashTrading(WashTradingDetector::new(WashTradingConfig::default()));
    let findings = Harness::new().run(&detector, wash_events());

    assert_eq!(findings.len(), 1);
    let (trigger, finding) = &findings[0];
    assert_eq!(trigger, "e2");
    assert_eq!(finding.pattern_type, PatternType::WashTrading);
    assert_eq!(finding.trader_ids, vec!["A".to_string(), "B".to_string()]);
    assert_eq!(finding.evidence_event_ids, vec!["e1", "e2"]);
}

#[test]
fn test_wash_trading_needs_balance_and_relationship() {
    let detector = Detector::WashTrading(WashTradingDetector::new(WashTradingConfig::default()));
    let mut unbalanced = wash_events();
    unbalanced[1].quantity = dec!(300);
    assert!(Harness::new().run(&detector, unbalanced).is_empty());

    let strict = Detector::WashTrading(WashTradingDetector::new(WashTradingConfig {
        min_edge_events: 3,
        ..Default::default()
    }));
    assert!(Harness::new().run(&strict, wash_events()).is_empty());
}

#[test]
fn test_wash_trading_self_trade_always_qualifies() {
    let detector = Detector::WashTrading(WashTradingDetector::new(WashTradingConfig {
        min_edge_events: 100,
        ..Default::default()
    }));
    let events = vec![
        fill("e1", "A", "O-1", Side::Buy, dec!(50), dec!(10), 0, "A"),
        fill("e2", "A", "O-2", Side::Sell, dec!(50), dec!(10), 100, "A"),
    ];
    let findings = Harness::new().run(&detector, events);
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].1.trader_ids, vec!["A".to_string()]);
}

#[test]
fn test_wash_trading_thresholds_are_monotone() {
    let counts: Vec<usize> = [dec!(1), dec!(250), dec!(500), dec!(501)]
        .into_iter()
        .map(|min_matched_quantity| {
            let detector = Detector::WashTrading(WashTradingDetector::new(WashTradingConfig {
                min_matched_quantity,
                ..Default::default()
            }));
            Harness::new().run(&detector, wash_events()).len()
        })
        .collect();
    assert_eq!(counts, vec![1, 1, 1, 0]);

    // Balanced pair with two shared fills scores 0.6 + 0.4 * 2/10
    let counts: Vec<usize> = [0.0, 0.5, 0.68, 0.7, 0.9]
        .into_iter()
        .map(|min_confidence| {
            let detector = Detector::WashTrading(WashTradingDetector::new(WashTradingConfig {
                min_confidence,
                ..Default::default()
            }));
            Harness::new().run(&detector, wash_events()).len()
        })
        .collect();
    assert!(counts.windows(2).all(|w| w[1] <= w[0]), "{counts:?}");
    assert_eq!(counts[0], 1);
    assert_eq!(counts[4], 0);
}

fn layering_events() -> Vec<TradeEvent> {
    vec![
        new_order("e1", "A", "L-1", Side::Sell, dec!(101), dec!(200), 0),
        new_order("e2", "A", "L-2", Side::Sell, dec!(102), dec!(200), 100),
        new_order("e3", "A", "L-3", Side::Sell, dec!(103), dec!(200), 200),
        fill("e4", "A", "B-1", Side::Buy, dec!(99), dec!(50), 1_000, "MM"),
        cancel("e5", "A", "L-1", Side::Sell, 1_200),
        cancel("e6", "A", "L-2", Side::Sell, 1_300),
        cancel("e7", "A", "L-3", Side::Sell, 1_400),
    ]
}

#[test]
fn test_layering_scenario() {
    let detector = Detector::Layering(LayeringDetector::new(LayeringConfig::default()));
    let findings = Harness::new().run(&detector, layering_events());

    // Fires once, on the cancel that pushes the ratio to the threshold
    assert_eq!(findings.len(), 1);
    let (trigger, finding) = &findings[0];
    assert_eq!(trigger, "e7");
    assert_eq!(finding.pattern_type, PatternType::Layering);
    assert_eq!(finding.evidence_order_ids.len(), 4);
    assert!((finding.confidence - 0.75).abs() < 1e-9);
}

#[test]
fn test_layering_needs_enough_levels() {
    let detector = Detector::Layering(LayeringDetector::new(LayeringConfig {
        min_layers: 4,
        ..Default::default()
    }));
    assert!(Harness::new().run(&detector, layering_events()).is_empty());

    // Same price on every order is one level, not a layer
    let flat = Detector::Layering(LayeringDetector::new(LayeringConfig::default()));
    let mut events = layering_events();
    for e in events.iter_mut().take(3) {
        e.price = dec!(101);
    }
    assert!(Harness::new().run(&flat, events).is_empty());
}

#[test]
fn test_layering_ignores_slow_cancels() {
    let detector = Detector::Layering(LayeringDetector::new(LayeringConfig::default()));
    let mut events = layering_events();
    events[6].timestamp = ts(5_000);
    assert!(Harness::new().run(&detector, events).is_empty());
}

#[test]
fn test_layering_thresholds_are_monotone() {
    let counts: Vec<usize> = [1, 2, 3, 4]
        .into_iter()
        .map(|min_layers| {
            let detector = Detector::Layering(LayeringDetector::new(LayeringConfig {
                min_layers,
                ..Default::default()
            }));
            Harness::new().run(&detector, layering_events()).len()
        })
        .collect();
    assert_eq!(counts, vec![1, 1, 1, 0]);

    // Lower ratios fire on an earlier cancel of the same layer, still once
    let counts: Vec<usize> = [0.25, 0.5, 0.75, 1.0, 1.01]
        .into_iter()
        .map(|min_cancel_ratio| {
            let detector = Detector::Layering(LayeringDetector::new(LayeringConfig {
                min_cancel_ratio,
                ..Default::default()
            }));
            Harness::new().run(&detector, layering_events()).len()
        })
        .collect();
    assert_eq!(counts, vec![1, 1, 1, 1, 0]);
}

fn front_running_events() -> Vec<TradeEvent> {
    vec![
        on_account(new_order("e1", "A", "A-1", Side::Buy, dec!(10), dec!(100), 0), "ACC-SHARED"),
        on_account(fill("e2", "A", "A-1", Side::Buy, dec!(10), dec!(100), 100, "X"), "ACC-SHARED"),
        on_account(new_order("e3", "B", "B-1", Side::Buy, dec!(11), dec!(5000), 500), "ACC-SHARED"),
        on_account(fill("e4", "B", "B-1", Side::Buy, dec!(11), dec!(5000), 1_000, "Y"), "ACC-SHARED"),
        on_account(fill("e5", "A", "A-2", Side::Sell, dec!(12), dec!(100), 2_000, "Z"), "ACC-SHARED"),
    ]
}

#[test]
fn test_front_running_scenario() {
    let detector = Detector::FrontRunning(FrontRunningDetector::new(FrontRunningConfig::default()));
    let findings = Harness::new().run(&detector, front_running_events());

    assert_eq!(findings.len(), 1);
    let (trigger, finding) = &findings[0];
    assert_eq!(trigger, "e5");
    assert_eq!(finding.pattern_type, PatternType::FrontRunning);
    assert_eq!(finding.trader_ids, vec!["A".to_string(), "B".to_string()]);
    assert_eq!(
        finding.evidence_event_ids,
        vec!["e1", "e2", "e3", "e4", "e5"]
    );
    assert!((finding.confidence - 0.9).abs() < 1e-9);
}

#[test]
fn test_front_running_requires_connection_and_timing() {
    let detector = Detector::FrontRunning(FrontRunningDetector::new(FrontRunningConfig::default()));

    // Unconnected: B trades through its own account
    let mut unconnected = front_running_events();
    for e in unconnected.iter_mut().filter(|e| e.trader_id == "B") {
        e.account_id = "ACC-B".to_string();
    }
    for e in unconnected.iter_mut().filter(|e| e.trader_id == "A") {
        e.account_id = "ACC-A".to_string();
    }
    assert!(Harness::new().run(&detector, unconnected).is_empty());

    // Large order arrives after δ
    let tight = Detector::FrontRunning(FrontRunningDetector::new(FrontRunningConfig {
        lead_window_ms: 400,
        ..Default::default()
    }));
    assert!(Harness::new().run(&tight, front_running_events()).is_empty());

    // Large order not large enough
    let big = Detector::FrontRunning(FrontRunningDetector::new(FrontRunningConfig {
        min_large_quantity: dec!(10000),
        ..Default::default()
    }));
    assert!(Harness::new().run(&big, front_running_events()).is_empty());
}

#[test]
fn test_front_running_thresholds_are_monotone() {
    let counts: Vec<usize> = [dec!(1000), dec!(2500), dec!(5000), dec!(5001)]
        .into_iter()
        .map(|min_large_quantity| {
            let detector = Detector::FrontRunning(FrontRunningDetector::new(FrontRunningConfig {
                min_large_quantity,
                ..Default::default()
            }));
            Harness::new().run(&detector, front_running_events()).len()
        })
        .collect();
    assert_eq!(counts, vec![1, 1, 1, 0]);

    // A opens 100 and closes all of it
    let counts: Vec<usize> = [0.5, 0.8, 1.0, 1.01]
        .into_iter()
        .map(|close_fraction| {
            let detector = Detector::FrontRunning(FrontRunningDetector::new(FrontRunningConfig {
                close_fraction,
                ..Default::default()
            }));
            Harness::new().run(&detector, front_running_events()).len()
        })
        .collect();
    assert_eq!(counts, vec![1, 1, 1, 0]);
}

#[test]
fn test_detector_set_respects_enabled_flags() {
    let mut config = DetectorsConfig::default();
    assert_eq!(DetectorSet::new(&config).len(), 4);

    config.layering.enabled = false;
    config.front_running.enabled = false;
    let set = DetectorSet::new(&config);
    let names: Vec<_> = set.detectors().iter().map(|d| d.name()).collect();
    assert_eq!(names, vec!["spoofing", "wash_trading"]);
}

#[test]
fn test_detector_set_runs_every_detector() {
    let set = DetectorSet::default();
    let harness = Harness::new();
    let mut patterns = Vec::new();
    for event in wash_events() {
        harness.graph.apply_event(&event).unwrap();
        let event = Arc::new(event);
        harness.windows.record(Arc::clone(&event));
        patterns.extend(
            set.evaluate(&event, &harness.graph, &harness.windows)
                .into_iter()
                .map(|f| f.pattern_type),
        );
    }
    assert_eq!(patterns, vec![PatternType::WashTrading]);
}

#[test]
fn test_config_problems() {
    let mut config = DetectorsConfig::default();
    assert!(config.problems().is_empty());
    config.spoofing.size_weight = 1.5;
    config.layering.min_layers = 1;
    assert_eq!(config.problems().len(), 2);
}
