//! Read-only Query Boundary
//!
//! Everything returned here is a copy taken at call time.

use std::sync::Arc;

use sentinel_alerts::{AlertAggregator, AlertError, AlertQuery};
use sentinel_core::{
    Alert, AlertId, EntityRef, NotFoundError, Order, PatternType, WindowKey,
};
use sentinel_graph::{EntityGraph, GraphSnapshot};
use sentinel_window::{WindowManager, WindowSnapshot};

#[derive(Clone)]
pub struct QueryBoundary {
    graph: Arc<EntityGraph>,
    windows: Arc<WindowManager>,
    aggregator: Arc<AlertAggregator>,
}

impl QueryBoundary {
    pub(crate) fn new(
        graph: Arc<EntityGraph>,
        windows: Arc<WindowManager>,
        aggregator: Arc<AlertAggregator>,
    ) -> Self {
        Self {
            graph,
            windows,
            aggregator,
        }
    }

    /// Subgraph within `depth` hops of `entity`
    pub fn get_entity_graph(
        &self,
        entity: &EntityRef,
        depth: usize,
    ) -> Result<GraphSnapshot, NotFoundError> {
        self.graph.snapshot(entity, depth)
    }

    pub fn get_window(&self, key: &WindowKey) -> Result<WindowSnapshot, NotFoundError> {
        self.windows.snapshot(key)
    }

    pub fn get_order(&self, order_id: &str) -> Result<Order, NotFoundError> {
        self.graph.order_history(order_id)
    }

    pub fn get_alert(&self, alert_id: AlertId) -> Result<Alert, AlertError> {
        self.aggregator.get(alert_id)
    }

    pub fn alerts_for_trader(&self, trader_id: &str, limit: usize) -> Vec<Alert> {
        self.aggregator.alerts_for_trader(trader_id, limit)
    }

    pub fn alerts_by_pattern(&self, pattern: PatternType, limit: usize) -> Vec<Alert> {
        self.aggregator.alerts_by_pattern(pattern, limit)
    }

    pub fn search_alerts(&self, query: &AlertQuery) -> Vec<Alert> {
        self.aggregator.search(query)
    }
}
