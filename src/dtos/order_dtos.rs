use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::order::OrderStatus;
use crate::models::user::User;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyView {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub phone: String,
}

impl From<&User> for PartyView {
    fn from(user: &User) -> Self {
        PartyView {
            id: user.id.to_hex(),
            name: user.name.clone(),
            phone: user.phone.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerOrderItemView {
    pub product_id: String,
    pub name: String,
    pub quantity: i64,
    pub price: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerOrderView {
    #[serde(rename = "_id")]
    pub id: String,
    pub buyer: Option<PartyView>,
    pub items: Vec<SellerOrderItemView>,
    pub total_amount: f64,
    pub status: OrderStatus,
    pub payment_method: String,
    pub transaction_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyerOrderItemView {
    pub product_id: String,
    pub name: String,
    pub price: f64,
    #[serde(rename = "type")]
    pub product_type: String,
    pub quantity: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyerOrderView {
    #[serde(rename = "_id")]
    pub id: String,
    pub seller: Option<PartyView>,
    pub items: Vec<BuyerOrderItemView>,
    pub total_amount: f64,
    pub status: OrderStatus,
    pub payment_method: String,
    pub transaction_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerView {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub phone: String,
    pub order_count: u32,
    pub last_order_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyRevenue {
    pub date: String,
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopProduct {
    pub product_id: String,
    pub name: String,
    pub quantity: i64,
    pub revenue: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerStats {
    pub days: i64,
    pub order_count: usize,
    pub total_revenue: f64,
    pub revenue_by_day: Vec<DailyRevenue>,
    pub top_products: Vec<TopProduct>,
}
