//! Entity graph
//!
//! ## Partitioning
//!
//! ```text
//!   order_id ──hash──► partition[i]  (Order projection, expiry index)
//!   entity   ──hash──► partition[j]  (Node + adjacency)
//! ```
//!
//! Every partition sits behind its own `RwLock`. A write holds exactly one
//! partition lock at a time, so writers on disjoint keys never contend and
//! readers only wait for the partition they touch. Events of one order always
//! land on the same partition, which serialises updates to that order.
//!
//! ## Failure isolation
//!
//! An `InvariantViolation` while folding an event into an order quarantines
//! the order's partition. Writes to it are refused until `reset_partition`.

use chrono::Duration;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use chrono::{TimeZone, Utc};
use sentinel_core::{
    EdgeWeight, EntityRef, InvariantViolation, LookupKind, NotFoundError, Order, OrderId,
    Relation, SurveillanceError, SurveillanceResult, Timestamp, TradeEvent, saturating_sub,
};
use sentinel_ports::GraphView;

use crate::config::GraphConfig;
use crate::partition::{EvictionStats, Partition};
use crate::seen::SeenSet;
use crate::snapshot::{GraphSnapshot, SnapshotEdge, SnapshotNode};

const NO_WATERMARK: i64 = i64::MIN;

/// Result of applying one event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    /// Same `event_id` applied before; nothing changed
    Duplicate,
}

/// Graph-wide counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphStats {
    pub partitions: usize,
    pub orders: usize,
    pub nodes: usize,
    pub edges: usize,
    pub quarantined: Vec<usize>,
    pub applied: u64,
    pub duplicates: u64,
    pub violations: u64,
}

pub struct EntityGraph {
    config: GraphConfig,
    partitions: Vec<RwLock<Partition>>,
    seen: SeenSet,
    /// Greatest applied event time, epoch millis
    watermark: AtomicI64,
    applied: AtomicU64,
    duplicates: AtomicU64,
    violations: AtomicU64,
}

impl EntityGraph {
    pub fn new(config: GraphConfig) -> Self {
        let count = config.partitions.max(1);
        Self {
            partitions: (0..count).map(|_| RwLock::new(Partition::default())).collect(),
            seen: SeenSet::new(config.seen_capacity),
            watermark: AtomicI64::new(NO_WATERMARK),
            applied: AtomicU64::new(0),
            duplicates: AtomicU64::new(0),
            violations: AtomicU64::new(0),
            config,
        }
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }

    fn partition_of<K: Hash + ?Sized>(&self, key: &K) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() as usize) % self.partitions.len()
    }

    /// Partition owning an order's projection
    pub fn order_partition(&self, order_id: &str) -> usize {
        self.partition_of(order_id)
    }

    /// Partition owning an entity node
    pub fn entity_partition(&self, entity: &EntityRef) -> usize {
        self.partition_of(entity)
    }

    /// Apply one event. Idempotent per `event_id`.
    pub fn apply_event(&self, event: &TradeEvent) -> SurveillanceResult<ApplyOutcome> {
        if !self.seen.insert(&event.event_id) {
            self.duplicates.fetch_add(1, Ordering::Relaxed);
            log::debug!("Duplicate event {} ignored", event.event_id);
            return Ok(ApplyOutcome::Duplicate);
        }

        if let Err(e) = self.apply_unseen(event) {
            // Not applied, so a replay after reconstruction must not look like a duplicate
            self.seen.remove(&event.event_id);
            return Err(e);
        }

        self.watermark
            .fetch_max(event.timestamp.timestamp_millis(), Ordering::AcqRel);
        self.applied.fetch_add(1, Ordering::Relaxed);
        Ok(ApplyOutcome::Applied)
    }

    fn apply_unseen(&self, event: &TradeEvent) -> SurveillanceResult<()> {
        let trader = EntityRef::trader(&event.trader_id);
        let instrument = EntityRef::instrument(&event.instrument_id);
        let account = EntityRef::account(&event.account_id);
        let counterparty = event
            .counterparty_id
            .as_ref()
            .filter(|_| event.is_fill())
            .map(EntityRef::trader);

        let mut edges = vec![
            (trader.clone(), instrument, Relation::Traded),
            (trader.clone(), account, Relation::CoLocatedWith),
        ];
        if let Some(cp) = counterparty {
            edges.push((trader, cp, Relation::CounterpartyOf));
        }

        // Refuse the whole event up front rather than apply part of it
        let order_partition = self.order_partition(&event.order_id);
        let touched = std::iter::once(order_partition).chain(
            edges
                .iter()
                .flat_map(|(a, b, _)| [self.entity_partition(a), self.entity_partition(b)]),
        );
        for partition in touched {
            if self.partitions[partition].read().quarantine.is_some() {
                return Err(SurveillanceError::PartitionQuarantined { partition });
            }
        }

        {
            let mut part = self.partitions[order_partition].write();
            if part.quarantine.is_some() {
                return Err(SurveillanceError::PartitionQuarantined {
                    partition: order_partition,
                });
            }
            if let Err(violation) = part.apply_order(event) {
                log::error!(
                    "Invariant violated in partition {} by event {}: {}. Partition quarantined",
                    order_partition,
                    event.event_id,
                    violation
                );
                part.quarantine = Some(violation.clone());
                self.violations.fetch_add(1, Ordering::Relaxed);
                return Err(SurveillanceError::Invariant {
                    partition: order_partition,
                    violation,
                });
            }
        }

        let notional = if event.is_fill() {
            event.notional()
        } else {
            Decimal::ZERO
        };
        for (a, b, relation) in &edges {
            self.record_edge(a, b, *relation, notional, event.timestamp);
            if a != b {
                self.record_edge(b, a, *relation, notional, event.timestamp);
            }
        }
        Ok(())
    }

    fn record_edge(
        &self,
        from: &EntityRef,
        to: &EntityRef,
        relation: Relation,
        notional: Decimal,
        at: Timestamp,
    ) {
        let mut part = self.partitions[self.entity_partition(from)].write();
        part.record_edge(from, to, relation, notional, at);
    }

    /// Greatest event timestamp applied so far
    pub fn watermark(&self) -> Option<Timestamp> {
        match self.watermark.load(Ordering::Acquire) {
            NO_WATERMARK => None,
            ms => Utc.timestamp_millis_opt(ms).single(),
        }
    }

    /// Current projection of an order
    pub fn order_history(&self, order_id: &str) -> Result<Order, NotFoundError> {
        self.partitions[self.order_partition(order_id)]
            .read()
            .orders
            .get(order_id)
            .cloned()
            .ok_or_else(|| NotFoundError::new(LookupKind::Order, order_id))
    }

    pub fn neighbors(
        &self,
        entity: &EntityRef,
        relation: Relation,
        within: Duration,
    ) -> Vec<EntityRef> {
        let cutoff = self.watermark().map(|w| saturating_sub(w, within));
        let part = self.partitions[self.entity_partition(entity)].read();
        let Some(node) = part.nodes.get(entity) else {
            return Vec::new();
        };
        let mut found: Vec<EntityRef> = node
            .edges
            .values()
            .filter(|e| e.relation == relation)
            .filter(|e| cutoff.is_none_or(|c| e.last_seen >= c))
            .map(|e| e.target.clone())
            .collect();
        found.sort();
        found
    }

    pub fn edge_weight(
        &self,
        from: &EntityRef,
        to: &EntityRef,
        relation: Relation,
    ) -> Option<EdgeWeight> {
        let part = self.partitions[self.entity_partition(from)].read();
        part.nodes
            .get(from)?
            .edges
            .get(&(relation, to.clone()))
            .map(|e| e.weight)
    }

    /// Breadth-first copy of the subgraph within `depth` hops of `root`
    pub fn snapshot(&self, root: &EntityRef, depth: usize) -> Result<GraphSnapshot, NotFoundError> {
        let mut degrees: BTreeMap<EntityRef, usize> = BTreeMap::new();
        let mut nodes = Vec::new();
        let mut edges = Vec::new();
        let mut seen_edges: BTreeSet<(EntityRef, EntityRef, Relation)> =
            BTreeSet::new();
        let mut queue = VecDeque::new();

        degrees.insert(root.clone(), 0);
        queue.push_back(root.clone());

        while let Some(entity) = queue.pop_front() {
            let degree = degrees.get(&entity).copied().unwrap_or(0);
            // Lock held only while copying this node
            let copied = {
                let part = self.partitions[self.entity_partition(&entity)].read();
                part.nodes.get(&entity).cloned()
            };
            let Some(node) = copied else {
                if degree == 0 {
                    return Err(NotFoundError::new(LookupKind::Entity, root.to_string()));
                }
                // Endpoint evicted between reads
                continue;
            };

            nodes.push(SnapshotNode {
                entity: entity.clone(),
                degree,
                first_seen: node.first_seen,
                last_seen: node.last_seen,
            });
            if degree >= depth {
                continue;
            }

            let mut adjacent: Vec<_> = node.edges.into_values().collect();
            adjacent.sort_by(|a, b| (a.relation, &a.target).cmp(&(b.relation, &b.target)));
            for edge in adjacent {
                let key = if entity <= edge.target {
                    (entity.clone(), edge.target.clone(), edge.relation)
                } else {
                    (edge.target.clone(), entity.clone(), edge.relation)
                };
                if seen_edges.insert(key) {
                    edges.push(SnapshotEdge {
                        from: entity.clone(),
                        to: edge.target.clone(),
                        relation: edge.relation,
                        weight: edge.weight,
                        first_seen: edge.first_seen,
                        last_seen: edge.last_seen,
                    });
                }
                if !degrees.contains_key(&edge.target) {
                    degrees.insert(edge.target.clone(), degree + 1);
                    queue.push_back(edge.target);
                }
            }
        }

        Ok(GraphSnapshot {
            root: root.clone(),
            depth,
            as_of: self.watermark(),
            nodes,
            edges,
        })
    }

    /// Drop orders, edges and nodes untouched since `now - retention`.
    ///
    /// Orders in `pinned` survive. Quarantined partitions are left as they are
    /// so their state can be inspected before reconstruction.
    pub fn evict_expired(
        &self,
        now: Timestamp,
        retention: Duration,
        pinned: &HashSet<OrderId>,
    ) -> EvictionStats {
        let cutoff = saturating_sub(now, retention);
        let mut total = EvictionStats::default();
        for (index, partition) in self.partitions.iter().enumerate() {
            let mut part = partition.write();
            if part.quarantine.is_some() {
                log::debug!("Skipping eviction of quarantined partition {}", index);
                continue;
            }
            total.absorb(part.evict(cutoff, pinned));
        }
        if total.orders + total.edges + total.nodes > 0 {
            log::debug!(
                "Graph eviction: {} orders, {} edges, {} nodes ({} pinned orders kept)",
                total.orders,
                total.edges,
                total.nodes,
                total.pinned
            );
        }
        total
    }

    /// Partitions currently quarantined, with the violation that caused it
    pub fn quarantined_partitions(&self) -> Vec<(usize, InvariantViolation)> {
        self.partitions
            .iter()
            .enumerate()
            .filter_map(|(i, p)| p.read().quarantine.clone().map(|v| (i, v)))
            .collect()
    }

    /// Wipe a partition so it can be rebuilt by replaying its events.
    /// Returns the violation that had quarantined it, if any.
    pub fn reset_partition(&self, index: usize) -> Option<InvariantViolation> {
        let partition = self.partitions.get(index)?;
        let cleared = partition.write().clear();
        log::info!("Partition {} reset for reconstruction", index);
        cleared
    }

    pub fn stats(&self) -> GraphStats {
        let mut stats = GraphStats {
            partitions: self.partitions.len(),
            applied: self.applied.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
            violations: self.violations.load(Ordering::Relaxed),
            ..Default::default()
        };
        for (index, partition) in self.partitions.iter().enumerate() {
            let part = partition.read();
            stats.orders += part.orders.len();
            stats.nodes += part.nodes.len();
            stats.edges += part.edge_count();
            if part.quarantine.is_some() {
                stats.quarantined.push(index);
            }
        }
        stats
    }
}

impl Default for EntityGraph {
    fn default() -> Self {
        Self::new(GraphConfig::default())
    }
}

impl GraphView for EntityGraph {
    fn order(&self, order_id: &OrderId) -> Result<Order, NotFoundError> {
        self.order_history(order_id)
    }

    fn neighbors(&self, entity: &EntityRef, relation: Relation, within: Duration) -> Vec<EntityRef> {
        EntityGraph::neighbors(self, entity, relation, within)
    }

    fn edge_weight(
        &self,
        from: &EntityRef,
        to: &EntityRef,
        relation: Relation,
    ) -> Option<EdgeWeight> {
        EntityGraph::edge_weight(self, from, to, relation)
    }
}
