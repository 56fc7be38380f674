//! Live venue port trait: order submission and tracking.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::error::VenueError;
use crate::domain::order::{Order, OrderSide, OrderStatus};

#[async_trait]
pub trait VenuePort: Send + Sync {
    /// Submit a market order. The returned order carries the venue-assigned
    /// id used for all further status polling.
    async fn submit_order(
        &self,
        symbol: &str,
        side: OrderSide,
        amount: f64,
    ) -> Result<Order, VenueError>;

    async fn order_status(&self, order_id: &str) -> Result<OrderStatus, VenueError>;

    /// Orders currently open at the venue, optionally filtered by symbol.
    async fn open_orders(&self, symbol: Option<&str>) -> Result<Vec<Order>, VenueError>;
}

#[async_trait]
impl<T: VenuePort + ?Sized> VenuePort for Arc<T> {
    async fn submit_order(
        &self,
        symbol: &str,
        side: OrderSide,
        amount: f64,
    ) -> Result<Order, VenueError> {
        (**self).submit_order(symbol, side, amount).await
    }

    async fn order_status(&self, order_id: &str) -> Result<OrderStatus, VenueError> {
        (**self).order_status(order_id).await
    }

    async fn open_orders(&self, symbol: Option<&str>) -> Result<Vec<Order>, VenueError> {
        (**self).open_orders(symbol).await
    }
}
