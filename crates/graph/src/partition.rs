use priority_queue::PriorityQueue;
use rust_decimal::Decimal;
use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};

use sentinel_core::{
    Edge, EdgeWeight, EntityRef, InvariantViolation, Order, OrderId, Relation, Timestamp,
    TradeEvent,
};

/// Node with its adjacency list
#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub first_seen: Timestamp,
    pub last_seen: Timestamp,
    pub edges: HashMap<(Relation, EntityRef), Edge>,
}

impl Node {
    fn new(at: Timestamp) -> Self {
        Self {
            first_seen: at,
            last_seen: at,
            edges: HashMap::new(),
        }
    }
}

/// Counts removed by one eviction pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvictionStats {
    pub orders: usize,
    pub edges: usize,
    pub nodes: usize,
    /// Expired orders kept because an open alert references them
    pub pinned: usize,
}

impl EvictionStats {
    pub(crate) fn absorb(&mut self, other: EvictionStats) {
        self.orders += other.orders;
        self.edges += other.edges;
        self.nodes += other.nodes;
        self.pinned += other.pinned;
    }
}

/// One independently locked slice of the graph
#[derive(Default)]
pub(crate) struct Partition {
    pub orders: HashMap<OrderId, Order>,
    /// Oldest `last_update` on top
    pub expiry: PriorityQueue<OrderId, Reverse<Timestamp>>,
    pub nodes: HashMap<EntityRef, Node>,
    pub quarantine: Option<InvariantViolation>,
}

impl Partition {
    /// Fold an event into its order projection. Leaves state untouched on error.
    pub fn apply_order(&mut self, event: &TradeEvent) -> Result<(), InvariantViolation> {
        let last_update = match self.orders.get_mut(&event.order_id) {
            Some(order) => {
                order.apply(event)?;
                order.last_update
            }
            None => {
                let order = Order::open(event)?;
                let last_update = order.last_update;
                self.orders.insert(event.order_id.clone(), order);
                last_update
            }
        };
        self.expiry.push(event.order_id.clone(), Reverse(last_update));
        Ok(())
    }

    /// Add one observation to the edge `from -> to`, creating both as needed
    pub fn record_edge(
        &mut self,
        from: &EntityRef,
        to: &EntityRef,
        relation: Relation,
        notional: Decimal,
        at: Timestamp,
    ) {
        let node = self
            .nodes
            .entry(from.clone())
            .or_insert_with(|| Node::new(at));
        if at > node.last_seen {
            node.last_seen = at;
        }
        let edge = node
            .edges
            .entry((relation, to.clone()))
            .or_insert_with(|| Edge {
                relation,
                target: to.clone(),
                weight: EdgeWeight::default(),
                first_seen: at,
                last_seen: at,
            });
        edge.weight.record(notional);
        if at > edge.last_seen {
            edge.last_seen = at;
        }
    }

    pub fn evict(&mut self, cutoff: Timestamp, pinned: &HashSet<OrderId>) -> EvictionStats {
        let mut stats = EvictionStats::default();

        let mut kept = Vec::new();
        while let Some((_, Reverse(last_update))) = self.expiry.peek() {
            if *last_update >= cutoff {
                break;
            }
            let Some((order_id, priority)) = self.expiry.pop() else {
                break;
            };
            if pinned.contains(&order_id) {
                stats.pinned += 1;
                kept.push((order_id, priority));
                continue;
            }
            if self.orders.remove(&order_id).is_some() {
                stats.orders += 1;
            }
        }
        for (order_id, priority) in kept {
            self.expiry.push(order_id, priority);
        }

        self.nodes.retain(|_, node| {
            let before = node.edges.len();
            node.edges.retain(|_, edge| edge.last_seen >= cutoff);
            stats.edges += before - node.edges.len();
            let keep = !node.edges.is_empty() || node.last_seen >= cutoff;
            if !keep {
                stats.nodes += 1;
            }
            keep
        });

        stats
    }

    pub fn clear(&mut self) -> Option<InvariantViolation> {
        self.orders.clear();
        self.expiry.clear();
        self.nodes.clear();
        self.quarantine.take()
    }

    pub fn edge_count(&self) -> usize {
        self.nodes.values().map(|n| n.edges.len()).sum()
    }
}
