use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use mongodb::bson::oid::ObjectId;
use tokio::sync::RwLock;

use crate::database::store::{MarketStore, OrderFilter, ProductFilter, UserFilter};
use crate::errors::{AppError, Result};
use crate::models::order::{Order, OrderStatus};
use crate::models::product::{Product, UpdateProduct};
use crate::models::transaction::{Transaction, TransactionStatus};
use crate::models::user::{Role, User};

#[derive(Default)]
struct Tables {
    users: HashMap<ObjectId, User>,
    products: HashMap<ObjectId, Product>,
    orders: HashMap<ObjectId, Order>,
    transactions: HashMap<ObjectId, Transaction>,
}

/// In-process store. Every mutating call holds the single write lock for
/// its whole duration, which is what makes checkout atomic here.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn transactions_for_order(&self, order_id: &ObjectId) -> Vec<Transaction> {
        let tables = self.tables.read().await;
        tables
            .transactions
            .values()
            .filter(|tx| tx.order_id == *order_id)
            .cloned()
            .collect()
    }

    pub async fn transaction_count(&self) -> usize {
        self.tables.read().await.transactions.len()
    }
}

fn newest_first<T, F>(mut rows: Vec<T>, key: F) -> Vec<T>
where
    F: Fn(&T) -> (chrono::DateTime<Utc>, ObjectId),
{
    rows.sort_by(|a, b| key(b).cmp(&key(a)));
    rows
}

fn user_matches(user: &User, filter: &UserFilter) -> bool {
    filter.role.map_or(true, |role| user.role == role)
        && filter.roles.as_ref().map_or(true, |roles| roles.contains(&user.role))
        && filter.approved.map_or(true, |approved| user.approved == approved)
}

fn product_matches(product: &Product, filter: &ProductFilter) -> bool {
    filter.owner_id.map_or(true, |owner| product.owner_id == owner)
        && filter.product_type.map_or(true, |t| product.product_type == t)
        && filter
            .category
            .as_ref()
            .map_or(true, |c| product.category.as_deref() == Some(c.as_str()))
        && filter.verified.map_or(true, |v| product.verified == v)
}

fn order_matches(order: &Order, filter: &OrderFilter) -> bool {
    filter.buyer_id.map_or(true, |buyer| order.buyer_id == buyer)
        && filter.seller_id.map_or(true, |seller| order.seller_id == seller)
        && filter.created_since.map_or(true, |since| order.created_at >= since)
}

#[async_trait]
impl MarketStore for MemoryStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn insert_user(&self, user: &User) -> Result<()> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.phone == user.phone) {
            return Err(AppError::DuplicateKey(format!("phone {}", user.phone)));
        }
        tables.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_user(&self, id: &ObjectId) -> Result<Option<User>> {
        Ok(self.tables.read().await.users.get(id).cloned())
    }

    async fn find_user_by_phone(&self, phone: &str) -> Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.phone == phone).cloned())
    }

    async fn find_users(&self, ids: &[ObjectId]) -> Result<Vec<User>> {
        let tables = self.tables.read().await;
        Ok(ids.iter().filter_map(|id| tables.users.get(id).cloned()).collect())
    }

    async fn list_users(&self, filter: &UserFilter) -> Result<Vec<User>> {
        let tables = self.tables.read().await;
        let rows = tables
            .users
            .values()
            .filter(|u| user_matches(u, filter))
            .cloned()
            .collect();
        Ok(newest_first(rows, |u: &User| (u.created_at, u.id)))
    }

    async fn set_user_approved(&self, id: &ObjectId, approved: bool) -> Result<Option<User>> {
        let mut tables = self.tables.write().await;
        Ok(tables.users.get_mut(id).map(|user| {
            user.approved = approved;
            user.updated_at = Utc::now();
            user.clone()
        }))
    }

    async fn set_user_blocked(&self, id: &ObjectId, blocked: bool) -> Result<Option<User>> {
        let mut tables = self.tables.write().await;
        Ok(tables.users.get_mut(id).map(|user| {
            user.blocked = blocked;
            user.updated_at = Utc::now();
            user.clone()
        }))
    }

    async fn count_users(&self) -> Result<u64> {
        Ok(self.tables.read().await.users.len() as u64)
    }

    async fn count_users_by_role(&self) -> Result<HashMap<Role, u64>> {
        let tables = self.tables.read().await;
        let mut counts = HashMap::new();
        for user in tables.users.values() {
            *counts.entry(user.role).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn insert_product(&self, product: &Product) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.products.insert(product.id, product.clone());
        Ok(())
    }

    async fn find_product(&self, id: &ObjectId) -> Result<Option<Product>> {
        Ok(self.tables.read().await.products.get(id).cloned())
    }

    async fn find_products(&self, ids: &[ObjectId]) -> Result<Vec<Product>> {
        let tables = self.tables.read().await;
        Ok(ids.iter().filter_map(|id| tables.products.get(id).cloned()).collect())
    }

    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>> {
        let tables = self.tables.read().await;
        let rows = tables
            .products
            .values()
            .filter(|p| product_matches(p, filter))
            .cloned()
            .collect();
        Ok(newest_first(rows, |p: &Product| (p.created_at, p.id)))
    }

    async fn update_product(&self, id: &ObjectId, update: &UpdateProduct) -> Result<Option<Product>> {
        let mut tables = self.tables.write().await;
        Ok(tables.products.get_mut(id).map(|product| {
            product.apply(update);
            product.clone()
        }))
    }

    async fn set_product_verified(&self, id: &ObjectId, verified: bool) -> Result<Option<Product>> {
        let mut tables = self.tables.write().await;
        Ok(tables.products.get_mut(id).map(|product| {
            product.verified = verified;
            product.updated_at = Utc::now();
            product.clone()
        }))
    }

    async fn delete_product(&self, id: &ObjectId) -> Result<bool> {
        Ok(self.tables.write().await.products.remove(id).is_some())
    }

    async fn count_products(&self) -> Result<u64> {
        Ok(self.tables.read().await.products.len() as u64)
    }

    async fn commit_checkout(&self, order: &Order, transaction: &Transaction) -> Result<()> {
        let mut tables = self.tables.write().await;

        // Validate every line before touching anything.
        let mut requested: HashMap<ObjectId, i64> = HashMap::new();
        for item in &order.items {
            *requested.entry(item.product_id).or_insert(0) += item.quantity;
        }
        for (product_id, quantity) in &requested {
            let product = tables
                .products
                .get(product_id)
                .ok_or_else(|| AppError::not_found(format!("Product {}", product_id)))?;
            if product.quantity < *quantity {
                return Err(AppError::InsufficientStock {
                    product: product.name.clone(),
                    requested: *quantity,
                    available: product.quantity,
                });
            }
        }

        let now = Utc::now();
        for (product_id, quantity) in requested {
            if let Some(product) = tables.products.get_mut(&product_id) {
                product.quantity -= quantity;
                product.updated_at = now;
            }
        }
        tables.orders.insert(order.id, order.clone());
        tables.transactions.insert(transaction.id, transaction.clone());
        Ok(())
    }

    async fn fail_checkout(&self, order_id: &ObjectId) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();

        let items = match tables.orders.get_mut(order_id) {
            Some(order) if order.status == OrderStatus::Success => {
                order.status = OrderStatus::Failed;
                order.updated_at = now;
                order.items.clone()
            }
            _ => return Ok(false),
        };

        for tx in tables.transactions.values_mut().filter(|tx| tx.order_id == *order_id) {
            tx.status = TransactionStatus::Failed;
        }
        for item in items {
            if let Some(product) = tables.products.get_mut(&item.product_id) {
                product.quantity += item.quantity;
                product.updated_at = now;
            }
        }
        Ok(true)
    }

    async fn find_order(&self, id: &ObjectId) -> Result<Option<Order>> {
        Ok(self.tables.read().await.orders.get(id).cloned())
    }

    async fn list_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>> {
        let tables = self.tables.read().await;
        let rows = tables
            .orders
            .values()
            .filter(|o| order_matches(o, filter))
            .cloned()
            .collect();
        Ok(newest_first(rows, |o: &Order| (o.created_at, o.id)))
    }

    async fn update_order_status(
        &self,
        id: &ObjectId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<bool> {
        let mut tables = self.tables.write().await;
        match tables.orders.get_mut(id) {
            Some(order) if order.status == from => {
                order.status = to;
                order.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn count_orders(&self) -> Result<u64> {
        Ok(self.tables.read().await.orders.len() as u64)
    }

    async fn total_revenue(&self) -> Result<f64> {
        let tables = self.tables.read().await;
        Ok(tables
            .orders
            .values()
            .filter(|o| o.status.counts_as_revenue())
            .map(|o| o.total_amount)
            .sum())
    }

    async fn find_transaction_by_receipt(&self, receipt: &str) -> Result<Option<Transaction>> {
        let tables = self.tables.read().await;
        Ok(tables
            .transactions
            .values()
            .find(|tx| tx.mpesa_receipt == receipt)
            .cloned())
    }
}
