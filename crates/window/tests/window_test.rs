//! Window Manager Integration Test

use chrono::{Duration, TimeZone, Utc};
use rust_decimal_macros::dec;
use std::sync::Arc;

use sentinel_core::{EventType, Side, Timestamp, TradeEvent, WindowKey};
use sentinel_window::{WindowConfig, WindowManager};

fn ts(ms: i64) -> Timestamp {
    Utc.timestamp_millis_opt(1_700_000_000_000 + ms).unwrap()
}

fn event(id: &str, trader: &str, at_ms: i64) -> Arc<TradeEvent> {
    Arc::new(TradeEvent {
        event_id: id.to_string(),
        feed_id: "default".to_string(),
        timestamp: ts(at_ms),
        trader_id: trader.to_string(),
        account_id: "ACC".to_string(),
        instrument_id: "XYZ".to_string(),
        side: Side::Buy,
        price: dec!(100),
        quantity: dec!(1),
        order_id: format!("O-{id}"),
        event_type: EventType::New,
        counterparty_id: None,
    })
}

fn ids(events: &[Arc<TradeEvent>]) -> Vec<&str> {
    events.iter().map(|e| e.event_id.as_str()).collect()
}

fn manager(retention_ms: i64) -> WindowManager {
    WindowManager::new(WindowConfig {
        retention_ms,
        ..Default::default()
    })
}

#[test]
fn test_events_are_chronological_and_stable_on_ties() {
    let windows = manager(60_000);
    windows.record(event("e1", "A", 100));
    windows.record(event("e2", "A", 50));
    windows.record(event("e3", "A", 100));
    windows.record(event("e4", "A", 75));

    let key = WindowKey::new("A", "XYZ");
    let events = windows.events_in(&key, Duration::seconds(60));
    assert_eq!(ids(&events), vec!["e2", "e4", "e1", "e3"]);
}

#[test]
fn test_eviction_keeps_exactly_the_retention_range() {
    let windows = manager(1_000);
    for (i, at) in [0, 400, 999, 1_000, 1_500, 2_000].iter().enumerate() {
        windows.record(event(&format!("e{i}"), "A", *at));
    }

    let now = ts(2_000);
    let evicted = windows.evict_expired(now);
    assert_eq!(evicted, 3);

    let key = WindowKey::new("A", "XYZ");
    let events = windows.events_in(&key, Duration::milliseconds(1_000));
    assert!(
        events
            .iter()
            .all(|e| now - Duration::milliseconds(1_000) <= e.timestamp && e.timestamp <= now)
    );
    assert_eq!(ids(&events), vec!["e3", "e4", "e5"]);
}

#[test]
fn test_reads_trim_lazily() {
    let windows = manager(1_000);
    windows.record(event("old", "A", 0));
    windows.record(event("new", "A", 5_000));

    let key = WindowKey::new("A", "XYZ");
    // Lookback wider than retention still never returns expired events
    let events = windows.events_in(&key, Duration::seconds(10));
    assert_eq!(ids(&events), vec!["new"]);
    assert_eq!(windows.stats().evicted, 1);
}

#[test]
fn test_events_at_bounds_both_ends() {
    let windows = manager(60_000);
    for (i, at) in [0, 1_000, 2_000, 3_000].iter().enumerate() {
        windows.record(event(&format!("e{i}"), "A", *at));
    }
    let key = WindowKey::new("A", "XYZ");
    let events = windows.events_at(&key, Duration::milliseconds(1_000), ts(2_000));
    assert_eq!(ids(&events), vec!["e1", "e2"]);
}

#[test]
fn test_empty_windows_are_dropped_unless_held() {
    let windows = manager(1_000);
    windows.record(event("a1", "A", 0));
    windows.record(event("b1", "B", 0));
    windows.record(event("c1", "C", 10_000));

    let held_key = WindowKey::new("A", "XYZ");
    let hold = windows.hold(&held_key);
    windows.evict_expired(ts(10_000));

    assert!(windows.contains(&held_key));
    assert!(!windows.contains(&WindowKey::new("B", "XYZ")));

    drop(hold);
    windows.evict_expired(ts(10_000));
    assert!(!windows.contains(&held_key));
    assert_eq!(windows.stats().windows, 1);
}

#[test]
fn test_instrument_events_merge_across_traders() {
    let windows = manager(60_000);
    windows.record(event("a1", "A", 10));
    windows.record(event("b1", "B", 5));
    windows.record(event("a2", "A", 20));
    windows.record(event("b2", "B", 20));

    let merged = windows.instrument_events(&"XYZ".to_string(), Duration::seconds(1), ts(20));
    assert_eq!(ids(&merged), vec!["b1", "a1", "a2", "b2"]);
}

#[test]
fn test_window_cap_drops_oldest() {
    let windows = WindowManager::new(WindowConfig {
        retention_ms: 60_000,
        max_events_per_window: 3,
    });
    for i in 0..5 {
        windows.record(event(&format!("e{i}"), "A", i * 10));
    }
    let snapshot = windows.snapshot(&WindowKey::new("A", "XYZ")).unwrap();
    let kept: Vec<_> = snapshot.events.iter().map(|e| e.event_id.as_str()).collect();
    assert_eq!(kept, vec!["e2", "e3", "e4"]);
    assert_eq!(windows.stats().dropped, 2);
}

#[test]
fn test_snapshot_of_unknown_window_is_not_found() {
    let windows = WindowManager::default();
    assert!(windows.snapshot(&WindowKey::new("nobody", "XYZ")).is_err());
}
