use serde::{Deserialize, Serialize};

use sentinel_core::{EdgeWeight, EntityKind, EntityRef, Relation, Timestamp};

/// Node reached by a breadth-first walk, with its distance from the root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotNode {
    pub entity: EntityRef,
    /// Degrees of separation from the root (root = 0)
    pub degree: usize,
    pub first_seen: Timestamp,
    pub last_seen: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEdge {
    pub from: EntityRef,
    pub to: EntityRef,
    pub relation: Relation,
    pub weight: EdgeWeight,
    pub first_seen: Timestamp,
    pub last_seen: Timestamp,
}

/// Point-in-time copy of the subgraph around one entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub root: EntityRef,
    pub depth: usize,
    /// Graph watermark when the snapshot was taken
    pub as_of: Option<Timestamp>,
    pub nodes: Vec<SnapshotNode>,
    pub edges: Vec<SnapshotEdge>,
}

impl GraphSnapshot {
    /// Traders in the snapshot other than the root, closest first
    pub fn connected_traders(&self) -> Vec<(&EntityRef, usize)> {
        self.nodes
            .iter()
            .filter(|n| n.degree > 0 && n.entity.kind == EntityKind::Trader)
            .map(|n| (&n.entity, n.degree))
            .collect()
    }

    pub fn node(&self, entity: &EntityRef) -> Option<&SnapshotNode> {
        self.nodes.iter().find(|n| &n.entity == entity)
    }
}
