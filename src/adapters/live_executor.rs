//! Execution gateway backed by a live venue.
//!
//! Sizes entries from session cash, submits market orders through the
//! venue port and polls the order status until it settles or a bounded
//! timeout expires. At most one order is outstanding per symbol at any
//! time: the order slot is checked at the start of every execute and a
//! signal that arrives while a prior order is still pending is dropped
//! with a warning, never queued, since the market has moved on by the
//! next cycle.
//!
//! A status-poll timeout leaves the slot `Pending`, so the next execute
//! re-checks the venue before deciding anything. That re-check is the
//! guard against duplicate submission across cycles and restarts.

use async_trait::async_trait;
use chrono::Utc;
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tracing::{info, warn};

use crate::domain::error::{ExecutionError, VenueError};
use crate::domain::order::{Fill, Order, OrderSide, OrderSlot, OrderStatus};
use crate::domain::signal::{Direction, Signal};
use crate::ports::execution::ExecutionPort;
use crate::ports::venue::VenuePort;

const DEFAULT_STATUS_POLL: Duration = Duration::from_secs(1);
const DEFAULT_STATUS_TIMEOUT: Duration = Duration::from_secs(30);

/// Details of the submitted order, kept until it settles so a fill
/// observed later (after a timeout) can still be booked. Orders recovered
/// from a previous session carry no reference price and are never booked
/// against this session's cash.
#[derive(Debug, Clone)]
struct InFlight {
    order: Order,
    reference_price: Option<f64>,
}

pub struct LiveExecutor<V> {
    venue: V,
    symbol: String,
    cash: f64,
    position_size: f64,
    slot: OrderSlot,
    in_flight: Option<InFlight>,
    status_poll: Duration,
    status_timeout: Duration,
}

impl<V: VenuePort> LiveExecutor<V> {
    /// Connect to the venue and reconcile any order left open by a
    /// previous session: an open order for our symbol occupies the slot
    /// until it settles.
    pub async fn connect(
        venue: V,
        symbol: String,
        initial_cash: f64,
    ) -> Result<Self, ExecutionError> {
        let open = venue
            .open_orders(Some(&symbol))
            .await
            .map_err(map_venue_error)?;

        let (slot, in_flight) = match open.into_iter().next() {
            Some(order) => {
                warn!(order_id = %order.id, "open order found at startup, occupying slot");
                (
                    OrderSlot::Pending(order.id.clone()),
                    Some(InFlight {
                        reference_price: None,
                        order,
                    }),
                )
            }
            None => (OrderSlot::None, None),
        };

        Ok(LiveExecutor {
            venue,
            symbol,
            cash: initial_cash,
            position_size: 0.0,
            slot,
            in_flight,
            status_poll: DEFAULT_STATUS_POLL,
            status_timeout: DEFAULT_STATUS_TIMEOUT,
        })
    }

    pub fn with_status_poll(mut self, interval: Duration) -> Self {
        self.status_poll = interval;
        self
    }

    pub fn with_status_timeout(mut self, timeout: Duration) -> Self {
        self.status_timeout = timeout;
        self
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn position_size(&self) -> f64 {
        self.position_size
    }

    pub fn slot(&self) -> &OrderSlot {
        &self.slot
    }

    /// Book a settled order against session cash and position.
    fn settle(&mut self, status: OrderStatus) -> Option<Fill> {
        self.slot = OrderSlot::Settled;
        let in_flight = self.in_flight.take()?;
        if status != OrderStatus::Filled {
            return None;
        }
        let Some(price) = in_flight.reference_price else {
            warn!(
                order_id = %in_flight.order.id,
                "recovered order filled at unknown price, not booked; reconcile manually"
            );
            return None;
        };

        let amount = in_flight.order.requested_amount;
        match in_flight.order.side {
            OrderSide::Buy => {
                self.cash -= amount * price;
                self.position_size += amount;
            }
            OrderSide::Sell => {
                self.cash += amount * price;
                self.position_size -= amount;
            }
        }

        Some(Fill {
            order_id: in_flight.order.id,
            symbol: in_flight.order.symbol,
            side: in_flight.order.side,
            amount,
            price,
            timestamp: Utc::now(),
        })
    }

    /// Resolve a slot left `Pending` by a prior execute or session.
    ///
    /// Still pending → the new signal is dropped. Settled in the meantime
    /// → book it and free the slot for the new signal.
    async fn recheck_pending(&mut self) -> Result<(), ExecutionError> {
        let OrderSlot::Pending(order_id) = self.slot.clone() else {
            return Ok(());
        };

        let status = self
            .venue
            .order_status(&order_id)
            .await
            .map_err(map_venue_error)?;

        match status {
            OrderStatus::Pending => Err(ExecutionError::OrderPending { order_id }),
            OrderStatus::Filled => {
                info!(order_id = %order_id, "prior order filled while unobserved, booking it");
                self.settle(OrderStatus::Filled);
                Ok(())
            }
            OrderStatus::Rejected | OrderStatus::Cancelled => {
                warn!(order_id = %order_id, status = ?status, "prior order did not fill");
                self.settle(status);
                Ok(())
            }
        }
    }
}

#[async_trait]
impl<V: VenuePort> ExecutionPort for LiveExecutor<V> {
    async fn execute_signal(
        &mut self,
        signal: &Signal,
        sizing_fraction: f64,
    ) -> Result<Fill, ExecutionError> {
        self.recheck_pending().await?;

        let (side, amount) = match signal.direction {
            Direction::Long => {
                let amount = sizing_fraction * self.cash / signal.reference_price;
                if amount <= 0.0 {
                    return Err(ExecutionError::InsufficientBalance {
                        needed: signal.reference_price,
                        available: self.cash,
                    });
                }
                (OrderSide::Buy, amount)
            }
            Direction::Flat | Direction::Short => {
                if self.position_size <= 0.0 {
                    return Err(ExecutionError::InsufficientPosition {
                        symbol: signal.symbol.clone(),
                    });
                }
                (OrderSide::Sell, self.position_size)
            }
        };

        let order = self
            .venue
            .submit_order(&self.symbol, side, amount)
            .await
            .map_err(map_venue_error)?;

        info!(order_id = %order.id, side = %side, amount, "order submitted");
        self.slot = OrderSlot::Pending(order.id.clone());
        self.in_flight = Some(InFlight {
            order: order.clone(),
            reference_price: Some(signal.reference_price),
        });

        let deadline = Instant::now() + self.status_timeout;
        loop {
            let status = self
                .venue
                .order_status(&order.id)
                .await
                // Status unknown: keep the slot pending, the next cycle
                // re-checks before submitting anything.
                .map_err(map_venue_error)?;

            match status {
                OrderStatus::Filled => {
                    let fill = self.settle(OrderStatus::Filled).expect("order in flight");
                    return Ok(fill);
                }
                OrderStatus::Rejected => {
                    self.settle(OrderStatus::Rejected);
                    return Err(ExecutionError::SubmitRejected {
                        reason: "order rejected by venue".to_string(),
                    });
                }
                OrderStatus::Cancelled => {
                    self.settle(OrderStatus::Cancelled);
                    return Err(ExecutionError::SubmitRejected {
                        reason: "order cancelled by venue".to_string(),
                    });
                }
                OrderStatus::Pending => {
                    if Instant::now() >= deadline {
                        return Err(ExecutionError::Timeout {
                            order_id: order.id.clone(),
                        });
                    }
                    sleep(self.status_poll).await;
                }
            }
        }
    }

    fn backend_name(&self) -> &'static str {
        "live"
    }
}

fn map_venue_error(err: VenueError) -> ExecutionError {
    match err {
        VenueError::Rejected { reason } => ExecutionError::SubmitRejected { reason },
        VenueError::Transport { reason } => ExecutionError::Transport { reason },
    }
}
