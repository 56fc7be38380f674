//! Order and fill types shared by the execution backends.

use chrono::{DateTime, Utc};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    Pending,
    Filled,
    Rejected,
    Cancelled,
}

/// An order as the venue reports it. Owned by whichever execution backend
/// created it; after submission the core only polls its status.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: String,
    pub symbol: String,
    pub side: OrderSide,
    pub requested_amount: f64,
    pub status: OrderStatus,
}

/// Confirmation that a submitted order executed at a price/amount.
#[derive(Debug, Clone, PartialEq)]
pub struct Fill {
    pub order_id: String,
    pub symbol: String,
    pub side: OrderSide,
    pub amount: f64,
    pub price: f64,
    pub timestamp: DateTime<Utc>,
}

/// Per-symbol re-entrancy token for the live execution path.
///
/// Checked at the start of every execute and set at the end: `Pending`
/// blocks a new submission until the open order settles, `Settled` records
/// that the last order resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderSlot {
    None,
    Pending(String),
    Settled,
}

impl OrderSlot {
    pub fn is_pending(&self) -> bool {
        matches!(self, OrderSlot::Pending(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_display() {
        assert_eq!(OrderSide::Buy.to_string(), "BUY");
        assert_eq!(OrderSide::Sell.to_string(), "SELL");
    }

    #[test]
    fn slot_pending_check() {
        assert!(!OrderSlot::None.is_pending());
        assert!(OrderSlot::Pending("ord-1".into()).is_pending());
        assert!(!OrderSlot::Settled.is_pending());
    }
}
