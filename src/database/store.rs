use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;

use crate::errors::Result;
use crate::models::order::{Order, OrderStatus};
use crate::models::product::{Product, ProductType, UpdateProduct};
use crate::models::transaction::Transaction;
use crate::models::user::{Role, User};

#[derive(Debug, Default, Clone)]
pub struct UserFilter {
    pub role: Option<Role>,
    pub roles: Option<Vec<Role>>,
    pub approved: Option<bool>,
}

#[derive(Debug, Default, Clone)]
pub struct ProductFilter {
    pub owner_id: Option<ObjectId>,
    pub product_type: Option<ProductType>,
    pub category: Option<String>,
    pub verified: Option<bool>,
}

#[derive(Debug, Default, Clone)]
pub struct OrderFilter {
    pub buyer_id: Option<ObjectId>,
    pub seller_id: Option<ObjectId>,
    pub created_since: Option<DateTime<Utc>>,
}

/// Persistence seam for the marketplace. Listing calls return newest first.
///
/// `commit_checkout` and `fail_checkout` are all-or-nothing: either every
/// stock change and document write lands, or none does.
#[async_trait]
pub trait MarketStore: Send + Sync {
    async fn ping(&self) -> Result<()>;

    async fn insert_user(&self, user: &User) -> Result<()>;
    async fn find_user(&self, id: &ObjectId) -> Result<Option<User>>;
    async fn find_user_by_phone(&self, phone: &str) -> Result<Option<User>>;
    async fn find_users(&self, ids: &[ObjectId]) -> Result<Vec<User>>;
    async fn list_users(&self, filter: &UserFilter) -> Result<Vec<User>>;
    async fn set_user_approved(&self, id: &ObjectId, approved: bool) -> Result<Option<User>>;
    async fn set_user_blocked(&self, id: &ObjectId, blocked: bool) -> Result<Option<User>>;
    async fn count_users(&self) -> Result<u64>;
    async fn count_users_by_role(&self) -> Result<HashMap<Role, u64>>;

    async fn insert_product(&self, product: &Product) -> Result<()>;
    async fn find_product(&self, id: &ObjectId) -> Result<Option<Product>>;
    async fn find_products(&self, ids: &[ObjectId]) -> Result<Vec<Product>>;
    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>>;
    /// Field-wise patch: only the fields present in `update` are written, so
    /// stock is only touched when `update.quantity` is set.
    async fn update_product(&self, id: &ObjectId, update: &UpdateProduct) -> Result<Option<Product>>;
    async fn set_product_verified(&self, id: &ObjectId, verified: bool) -> Result<Option<Product>>;
    async fn delete_product(&self, id: &ObjectId) -> Result<bool>;
    async fn count_products(&self) -> Result<u64>;

    /// Decrements stock for every order line, then inserts the order and its
    /// transaction. Fails with `InsufficientStock` without writing anything
    /// when any line asks for more than is available.
    async fn commit_checkout(&self, order: &Order, transaction: &Transaction) -> Result<()>;

    /// Moves a `success` order and its transaction to `failed` and puts the
    /// ordered quantities back on the shelf. Returns `false` when the order
    /// was no longer in `success`.
    async fn fail_checkout(&self, order_id: &ObjectId) -> Result<bool>;

    async fn find_order(&self, id: &ObjectId) -> Result<Option<Order>>;
    async fn list_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>>;

    /// Compare-and-set on the order status. Returns `false` when the stored
    /// status no longer equals `from`.
    async fn update_order_status(
        &self,
        id: &ObjectId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<bool>;
    async fn count_orders(&self) -> Result<u64>;

    /// Sum of `total_amount` over orders whose status counts as revenue.
    async fn total_revenue(&self) -> Result<f64>;

    async fn find_transaction_by_receipt(&self, receipt: &str) -> Result<Option<Transaction>>;
}
