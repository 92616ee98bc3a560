use chrono::Duration;
use sentinel_core::{EdgeWeight, EntityRef, NotFoundError, Order, OrderId, Relation};

/// Read-only view of the entity graph offered to detectors
///
/// Implementations answer from current state; a detector may observe effects of
/// events it has not been invoked for yet, never a torn update of one event.
pub trait GraphView: Send + Sync {
    /// Current projection of an order
    fn order(&self, order_id: &OrderId) -> Result<Order, NotFoundError>;

    /// Entities connected to `entity` by `relation`, whose edge was touched within
    /// `within` of the graph watermark
    fn neighbors(&self, entity: &EntityRef, relation: Relation, within: Duration) -> Vec<EntityRef>;

    /// Aggregate weight of the edge `from -> to`, if it exists
    fn edge_weight(&self, from: &EntityRef, to: &EntityRef, relation: Relation)
    -> Option<EdgeWeight>;
}
