use serde::{Deserialize, Serialize};

/// Lifecycle status of an order projection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Resting with its full quantity
    Active,
    /// Some quantity executed, remainder still resting
    PartiallyFilled,
    /// Completely executed
    Filled,
    /// Pulled by the trader
    Cancelled,
}

impl OrderStatus {
    /// Returns true if the order can no longer change
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Filled | OrderStatus::Cancelled)
    }

    /// Returns true if the order still has quantity on the book
    pub fn is_resting(&self) -> bool {
        matches!(self, OrderStatus::Active | OrderStatus::PartiallyFilled)
    }
}
