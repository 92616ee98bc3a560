//! Entity Graph Integration Test
//!
//! Covers:
//! 1. Idempotent application per event id
//! 2. Order projection lookups
//! 3. Adjacency and edge weights
//! 4. Partition quarantine and reconstruction
//! 5. Eviction with pinned orders
//! 6. Breadth-first snapshots

use chrono::{Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashSet;

use sentinel_core::{
    EntityRef, EventType, LookupKind, OrderStatus, Relation, Side, SurveillanceError, Timestamp,
    TradeEvent,
};
use sentinel_graph::{ApplyOutcome, EntityGraph, GraphConfig};

fn ts(ms: i64) -> Timestamp {
    Utc.timestamp_millis_opt(1_700_000_000_000 + ms).unwrap()
}

fn event(
    id: &str,
    trader: &str,
    order: &str,
    event_type: EventType,
    side: Side,
    qty: Decimal,
    at_ms: i64,
) -> TradeEvent {
    TradeEvent {
        event_id: id.to_string(),
        feed_id: "default".to_string(),
        timestamp: ts(at_ms),
        trader_id: trader.to_string(),
        account_id: format!("ACC-{trader}"),
        instrument_id: "XYZ".to_string(),
        side,
        price: dec!(100),
        quantity: qty,
        order_id: order.to_string(),
        event_type,
        counterparty_id: None,
    }
}

fn fill_with(id: &str, trader: &str, order: &str, cp: &str, qty: Decimal, at_ms: i64) -> TradeEvent {
    let mut e = event(id, trader, order, EventType::Fill, Side::Buy, qty, at_ms);
    e.counterparty_id = Some(cp.to_string());
    e
}

#[test]
fn test_duplicate_event_is_noop() {
    let graph = EntityGraph::default();
    let new = event("e1", "A", "O-1", EventType::New, Side::Buy, dec!(100), 0);
    let fill = fill_with("e2", "A", "O-1", "B", dec!(40), 10);

    assert_eq!(graph.apply_event(&new).unwrap(), ApplyOutcome::Applied);
    assert_eq!(graph.apply_event(&fill).unwrap(), ApplyOutcome::Applied);
    let order_once = graph.order_history("O-1").unwrap();
    let weight_once = graph
        .edge_weight(&EntityRef::trader("A"), &EntityRef::trader("B"), Relation::CounterpartyOf)
        .unwrap();

    assert_eq!(graph.apply_event(&fill).unwrap(), ApplyOutcome::Duplicate);
    assert_eq!(graph.order_history("O-1").unwrap(), order_once);
    assert_eq!(
        graph
            .edge_weight(&EntityRef::trader("A"), &EntityRef::trader("B"), Relation::CounterpartyOf)
            .unwrap(),
        weight_once
    );
    assert_eq!(graph.stats().duplicates, 1);
}

#[test]
fn test_order_history_tracks_lifecycle() {
    let graph = EntityGraph::default();
    graph
        .apply_event(&event("e1", "A", "O-1", EventType::New, Side::Buy, dec!(100), 0))
        .unwrap();
    graph
        .apply_event(&event("e2", "A", "O-1", EventType::Fill, Side::Buy, dec!(30), 5))
        .unwrap();

    let order = graph.order_history("O-1").unwrap();
    assert_eq!(order.status, OrderStatus::PartiallyFilled);
    assert_eq!(order.remaining_quantity, dec!(70));

    let err = graph.order_history("O-404").unwrap_err();
    assert_eq!(err.kind, LookupKind::Order);
}

#[test]
fn test_counterparty_edges_are_bidirectional_with_weights() {
    let graph = EntityGraph::default();
    graph.apply_event(&fill_with("e1", "A", "O-1", "B", dec!(5), 0)).unwrap();
    graph.apply_event(&fill_with("e2", "A", "O-2", "B", dec!(5), 100)).unwrap();

    let a = EntityRef::trader("A");
    let b = EntityRef::trader("B");
    assert_eq!(
        graph.neighbors(&a, Relation::CounterpartyOf, Duration::minutes(1)),
        vec![b.clone()]
    );
    assert_eq!(
        graph.neighbors(&b, Relation::CounterpartyOf, Duration::minutes(1)),
        vec![a.clone()]
    );

    let weight = graph.edge_weight(&a, &b, Relation::CounterpartyOf).unwrap();
    assert_eq!(weight.event_count, 2);
    assert_eq!(weight.notional, dec!(1000));

    // Non-fill events add to TRADED count but not notional
    graph
        .apply_event(&event("e3", "A", "O-3", EventType::New, Side::Sell, dec!(9), 200))
        .unwrap();
    let traded = graph
        .edge_weight(&a, &EntityRef::instrument("XYZ"), Relation::Traded)
        .unwrap();
    assert_eq!(traded.event_count, 3);
    assert_eq!(traded.notional, dec!(1000));
}

#[test]
fn test_neighbors_respect_recency() {
    let graph = EntityGraph::default();
    graph.apply_event(&fill_with("e1", "A", "O-1", "B", dec!(1), 0)).unwrap();
    graph.apply_event(&fill_with("e2", "A", "O-2", "C", dec!(1), 60_000)).unwrap();

    let recent = graph.neighbors(
        &EntityRef::trader("A"),
        Relation::CounterpartyOf,
        Duration::seconds(10),
    );
    assert_eq!(recent, vec![EntityRef::trader("C")]);
}

#[test]
fn test_invariant_violation_quarantines_only_its_partition() {
    let graph = EntityGraph::new(GraphConfig {
        partitions: 64,
        ..Default::default()
    });
    graph
        .apply_event(&event("e1", "A", "O-1", EventType::New, Side::Buy, dec!(10), 0))
        .unwrap();
    let overfill = event("e2", "A", "O-1", EventType::Fill, Side::Buy, dec!(11), 1);
    let err = graph.apply_event(&overfill).unwrap_err();
    let SurveillanceError::Invariant { partition, .. } = err else {
        panic!("expected invariant violation, got {err:?}");
    };
    assert_eq!(partition, graph.order_partition("O-1"));
    assert_eq!(graph.quarantined_partitions().len(), 1);

    // Same order keeps failing while quarantined
    let next = event("e3", "A", "O-1", EventType::Cancel, Side::Buy, dec!(0), 2);
    assert!(matches!(
        graph.apply_event(&next),
        Err(SurveillanceError::PartitionQuarantined { .. })
    ));

    // An event that touches no quarantined partition still goes through
    if graph.entity_partition(&EntityRef::instrument("XYZ")) != partition {
        let (trader, order) = (0..1_000)
            .map(|i| (format!("T{i}"), format!("O-T{i}")))
            .find(|(t, o)| {
                let touched = [
                    graph.order_partition(o),
                    graph.entity_partition(&EntityRef::trader(t.as_str())),
                    graph.entity_partition(&EntityRef::account(format!("ACC-{t}"))),
                ];
                !touched.contains(&partition)
            })
            .unwrap();
        let other = event("e4", &trader, &order, EventType::New, Side::Sell, dec!(1), 3);
        assert_eq!(graph.apply_event(&other).unwrap(), ApplyOutcome::Applied);
    }

    // Reconstruction: reset, then replay including the once-failed event id
    assert!(graph.reset_partition(partition).is_some());
    assert!(graph.quarantined_partitions().is_empty());
    let mut corrected = overfill.clone();
    corrected.quantity = dec!(10);
    corrected.event_id = "e2".to_string();
    graph
        .apply_event(&event("e1-replay", "A", "O-1", EventType::New, Side::Buy, dec!(10), 0))
        .unwrap();
    assert_eq!(graph.apply_event(&corrected).unwrap(), ApplyOutcome::Applied);
    assert_eq!(graph.order_history("O-1").unwrap().status, OrderStatus::Filled);
}

#[test]
fn test_eviction_respects_pinned_orders() {
    let graph = EntityGraph::default();
    graph
        .apply_event(&event("e1", "A", "O-old", EventType::New, Side::Buy, dec!(1), 0))
        .unwrap();
    graph
        .apply_event(&event("e2", "A", "O-pinned", EventType::New, Side::Buy, dec!(1), 0))
        .unwrap();
    graph
        .apply_event(&event("e3", "B", "O-new", EventType::New, Side::Buy, dec!(1), 50_000))
        .unwrap();

    let pinned: HashSet<String> = ["O-pinned".to_string()].into_iter().collect();
    let evicted = graph.evict_expired(ts(60_000), Duration::seconds(30), &pinned);

    assert_eq!(evicted.orders, 1);
    assert_eq!(evicted.pinned, 1);
    assert!(graph.order_history("O-old").is_err());
    assert!(graph.order_history("O-pinned").is_ok());
    assert!(graph.order_history("O-new").is_ok());

    // Trader A's edges expired with its events, B's are fresh
    assert!(
        graph
            .edge_weight(&EntityRef::trader("A"), &EntityRef::instrument("XYZ"), Relation::Traded)
            .is_none()
    );
    assert!(
        graph
            .edge_weight(&EntityRef::trader("B"), &EntityRef::instrument("XYZ"), Relation::Traded)
            .is_some()
    );
}

#[test]
fn test_snapshot_reports_degrees_of_separation() {
    let graph = EntityGraph::default();
    graph.apply_event(&fill_with("e1", "A", "O-1", "B", dec!(1), 0)).unwrap();
    graph.apply_event(&fill_with("e2", "B", "O-2", "C", dec!(1), 10)).unwrap();

    let a = EntityRef::trader("A");
    let snapshot = graph.snapshot(&a, 2).unwrap();
    assert_eq!(snapshot.node(&a).unwrap().degree, 0);
    assert_eq!(snapshot.node(&EntityRef::trader("B")).unwrap().degree, 1);
    assert_eq!(snapshot.node(&EntityRef::trader("C")).unwrap().degree, 2);

    let traders: Vec<_> = snapshot
        .connected_traders()
        .into_iter()
        .map(|(t, d)| (t.id.clone(), d))
        .collect();
    assert!(traders.contains(&("B".to_string(), 1)));
    assert!(traders.contains(&("C".to_string(), 2)));

    let shallow = graph.snapshot(&a, 1).unwrap();
    assert!(shallow.node(&EntityRef::trader("C")).is_none());

    assert!(graph.snapshot(&EntityRef::trader("nobody"), 1).is_err());
}

#[test]
fn test_timestamp_order_matches_sequential_arrival() {
    let events = [
        event("e1", "A", "O-1", EventType::New, Side::Buy, dec!(100), 0),
        event("e2", "A", "O-1", EventType::Fill, Side::Buy, dec!(20), 10),
        event("e3", "A", "O-1", EventType::Modify, Side::Buy, dec!(60), 20),
        event("e4", "A", "O-1", EventType::Fill, Side::Buy, dec!(40), 30),
    ];

    let sequential = EntityGraph::default();
    for e in &events {
        sequential.apply_event(e).unwrap();
    }

    // Submitted shuffled, processed after sorting by timestamp
    let mut shuffled = vec![events[2].clone(), events[0].clone(), events[3].clone(), events[1].clone()];
    shuffled.sort_by_key(|e| e.timestamp);
    let reordered = EntityGraph::default();
    for e in &shuffled {
        reordered.apply_event(e).unwrap();
    }

    assert_eq!(
        sequential.order_history("O-1").unwrap(),
        reordered.order_history("O-1").unwrap()
    );
    assert_eq!(
        reordered.order_history("O-1").unwrap().status,
        OrderStatus::Filled
    );
}
