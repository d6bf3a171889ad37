use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use mongodb::bson;
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::errors::{AppError, Result};

pub const DEFAULT_PAYMENT_METHOD: &str = "M-Pesa";

/// Order lifecycle:
///
/// ```text
/// pending -> success -> accepted -> fulfilled
///    |          |-> declined
///    v          '-> failed
///  failed
/// ```
///
/// Checkout moves `pending -> success` inside the same atomic write. The
/// seller drives `accepted`, `declined` and `fulfilled`; a failed payment
/// callback moves a paid order to `failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Success,
    Failed,
    Accepted,
    Declined,
    Fulfilled,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Success => "success",
            OrderStatus::Failed => "failed",
            OrderStatus::Accepted => "accepted",
            OrderStatus::Declined => "declined",
            OrderStatus::Fulfilled => "fulfilled",
        }
    }

    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Success)
                | (Pending, Failed)
                | (Success, Accepted)
                | (Success, Declined)
                | (Success, Failed)
                | (Accepted, Fulfilled)
        )
    }

    /// Transitions a seller may request through the API.
    pub fn is_seller_transition(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Success, Accepted) | (Success, Declined) | (Accepted, Fulfilled)
        )
    }

    pub fn counts_as_revenue(self) -> bool {
        !matches!(self, OrderStatus::Failed | OrderStatus::Declined | OrderStatus::Pending)
    }

    pub const NON_REVENUE: [OrderStatus; 3] =
        [OrderStatus::Pending, OrderStatus::Failed, OrderStatus::Declined];
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(OrderStatus::Pending),
            "success" => Ok(OrderStatus::Success),
            "failed" => Ok(OrderStatus::Failed),
            "accepted" => Ok(OrderStatus::Accepted),
            "declined" => Ok(OrderStatus::Declined),
            "fulfilled" => Ok(OrderStatus::Fulfilled),
            other => Err(AppError::invalid_input(format!("Invalid order status: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ObjectId,
    pub name: String,
    pub quantity: i64,
    pub unit_price: f64,
}

impl OrderItem {
    pub fn line_total(&self) -> f64 {
        self.unit_price * self.quantity as f64
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub buyer_id: ObjectId,
    pub seller_id: ObjectId,
    pub items: Vec<OrderItem>,
    pub total_amount: f64,
    pub status: OrderStatus,
    pub payment_method: String,
    pub transaction_id: Option<String>,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn new(buyer_id: ObjectId, seller_id: ObjectId, items: Vec<OrderItem>) -> Self {
        let now = Utc::now();
        let total_amount = items.iter().map(OrderItem::line_total).sum();
        Order {
            id: ObjectId::new(),
            buyer_id,
            seller_id,
            items,
            total_amount,
            status: OrderStatus::Pending,
            payment_method: DEFAULT_PAYMENT_METHOD.to_string(),
            transaction_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn transition(&mut self, next: OrderStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(AppError::InvalidTransition {
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn mark_paid(&mut self, receipt: &str) -> Result<()> {
        self.transition(OrderStatus::Success)?;
        self.transaction_id = Some(receipt.to_string());
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CartItem {
    #[serde(rename = "_id")]
    pub product_id: String,
    pub quantity: i64,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default, rename = "sellerId")]
    pub seller_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CartRequest {
    #[serde(rename = "cartItems", default)]
    pub cart_items: Vec<CartItem>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateOrderStatus {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    pub days: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemResponse {
    pub product_id: String,
    pub name: String,
    pub quantity: i64,
    pub price: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub buyer_id: String,
    pub seller_id: String,
    pub items: Vec<OrderItemResponse>,
    pub total_amount: f64,
    pub status: OrderStatus,
    pub payment_method: String,
    pub transaction_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        OrderResponse {
            id: order.id.to_hex(),
            buyer_id: order.buyer_id.to_hex(),
            seller_id: order.seller_id.to_hex(),
            items: order
                .items
                .into_iter()
                .map(|item| OrderItemResponse {
                    product_id: item.product_id.to_hex(),
                    name: item.name,
                    quantity: item.quantity,
                    price: item.unit_price,
                })
                .collect(),
            total_amount: order.total_amount,
            status: order.status,
            payment_method: order.payment_method,
            transaction_id: order.transaction_id,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PlaceOrderResponse {
    pub msg: String,
    pub order: OrderResponse,
}
