//! REST live-venue adapter: order submission and tracking over HTTP.
//!
//! Authentication is an API key header; the venue assigns order ids.
//! 4xx responses are venue rejections, everything else that goes wrong on
//! the wire is a transport failure.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::error::VenueError;
use crate::domain::order::{Order, OrderSide, OrderStatus};
use crate::ports::venue::VenuePort;

const API_KEY_HEADER: &str = "X-API-KEY";

pub struct RestVenue {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl RestVenue {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        RestVenue {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    async fn decode_order(response: reqwest::Response) -> Result<Order, VenueError> {
        let dto: OrderDto = response.json().await.map_err(|e| VenueError::Transport {
            reason: format!("malformed order payload: {e}"),
        })?;
        dto.try_into()
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, VenueError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        if status.is_client_error() {
            Err(VenueError::Rejected {
                reason: format!("{status}: {body}"),
            })
        } else {
            Err(VenueError::Transport {
                reason: format!("{status}: {body}"),
            })
        }
    }
}

#[derive(Debug, Serialize)]
struct SubmitOrderRequest<'a> {
    symbol: &'a str,
    side: &'a str,
    #[serde(rename = "type")]
    order_type: &'a str,
    quantity: f64,
}

#[derive(Debug, Deserialize)]
struct OrderDto {
    id: String,
    symbol: String,
    side: String,
    quantity: f64,
    status: String,
}

impl TryFrom<OrderDto> for Order {
    type Error = VenueError;

    fn try_from(dto: OrderDto) -> Result<Self, VenueError> {
        Ok(Order {
            id: dto.id,
            symbol: dto.symbol,
            side: parse_side(&dto.side)?,
            requested_amount: dto.quantity,
            status: parse_status(&dto.status)?,
        })
    }
}

fn parse_side(side: &str) -> Result<OrderSide, VenueError> {
    match side.to_uppercase().as_str() {
        "BUY" => Ok(OrderSide::Buy),
        "SELL" => Ok(OrderSide::Sell),
        other => Err(VenueError::Transport {
            reason: format!("unexpected order side '{other}'"),
        }),
    }
}

fn parse_status(status: &str) -> Result<OrderStatus, VenueError> {
    match status.to_uppercase().as_str() {
        "NEW" | "PENDING" | "PARTIALLY_FILLED" => Ok(OrderStatus::Pending),
        "FILLED" => Ok(OrderStatus::Filled),
        "REJECTED" | "EXPIRED" => Ok(OrderStatus::Rejected),
        "CANCELLED" | "CANCELED" => Ok(OrderStatus::Cancelled),
        other => Err(VenueError::Transport {
            reason: format!("unexpected order status '{other}'"),
        }),
    }
}

fn transport(e: reqwest::Error) -> VenueError {
    VenueError::Transport {
        reason: e.to_string(),
    }
}

#[async_trait]
impl VenuePort for RestVenue {
    async fn submit_order(
        &self,
        symbol: &str,
        side: OrderSide,
        amount: f64,
    ) -> Result<Order, VenueError> {
        let request = SubmitOrderRequest {
            symbol,
            side: match side {
                OrderSide::Buy => "BUY",
                OrderSide::Sell => "SELL",
            },
            order_type: "MARKET",
            quantity: amount,
        };

        let response = self
            .client
            .post(format!("{}/api/v3/order", self.base_url))
            .header(API_KEY_HEADER, &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(transport)?;

        Self::decode_order(Self::check_status(response).await?).await
    }

    async fn order_status(&self, order_id: &str) -> Result<OrderStatus, VenueError> {
        let response = self
            .client
            .get(format!("{}/api/v3/order/{}", self.base_url, order_id))
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(transport)?;

        let order = Self::decode_order(Self::check_status(response).await?).await?;
        Ok(order.status)
    }

    async fn open_orders(&self, symbol: Option<&str>) -> Result<Vec<Order>, VenueError> {
        let mut request = self
            .client
            .get(format!("{}/api/v3/openOrders", self.base_url))
            .header(API_KEY_HEADER, &self.api_key);
        if let Some(symbol) = symbol {
            request = request.query(&[("symbol", symbol)]);
        }

        let response = request.send().await.map_err(transport)?;
        let dtos: Vec<OrderDto> = Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| VenueError::Transport {
                reason: format!("malformed order list payload: {e}"),
            })?;

        dtos.into_iter().map(Order::try_from).collect()
    }
}
