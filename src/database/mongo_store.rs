use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use futures_util::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, Bson, DateTime as BsonDateTime, Document};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::IndexOptions;
use mongodb::{Client, ClientSession, Collection, Database, IndexModel};
use tracing::{info, warn};

use crate::database::store::{MarketStore, OrderFilter, ProductFilter, UserFilter};
use crate::errors::{AppError, Result};
use crate::models::order::{Order, OrderStatus};
use crate::models::product::{Product, UpdateProduct};
use crate::models::transaction::{Transaction, TransactionStatus};
use crate::models::user::{Role, User};

const USERS: &str = "users";
const PRODUCTS: &str = "products";
const ORDERS: &str = "orders";
const TRANSACTIONS: &str = "transactions";

/// MongoDB-backed store. Checkout runs inside a client-session transaction,
/// so the deployment must be a replica set (a single-node one is enough).
#[derive(Clone)]
pub struct MongoStore {
    client: Client,
    db: Database,
}

impl MongoStore {
    pub fn new(client: Client, db: Database) -> Self {
        MongoStore { client, db }
    }

    fn users(&self) -> Collection<User> {
        self.db.collection(USERS)
    }

    fn products(&self) -> Collection<Product> {
        self.db.collection(PRODUCTS)
    }

    fn orders(&self) -> Collection<Order> {
        self.db.collection(ORDERS)
    }

    fn transactions(&self) -> Collection<Transaction> {
        self.db.collection(TRANSACTIONS)
    }

    pub async fn ensure_indexes(&self) -> Result<()> {
        let unique = IndexOptions::builder().unique(true).build();

        self.users()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "phone": 1 })
                    .options(unique.clone())
                    .build(),
            )
            .await?;
        self.products()
            .create_index(IndexModel::builder().keys(doc! { "owner_id": 1 }).build())
            .await?;
        self.orders()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "seller_id": 1, "created_at": -1 })
                    .build(),
            )
            .await?;
        self.orders()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "buyer_id": 1, "created_at": -1 })
                    .build(),
            )
            .await?;
        self.transactions()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "mpesa_receipt": 1 })
                    .options(unique)
                    .build(),
            )
            .await?;

        info!("✅ MongoDB indexes ensured");
        Ok(())
    }

    async fn checkout_in_session(
        &self,
        session: &mut ClientSession,
        order: &Order,
        transaction: &Transaction,
    ) -> Result<()> {
        let now = BsonDateTime::from_chrono(Utc::now());

        for item in &order.items {
            let result = self
                .products()
                .update_one(
                    doc! { "_id": item.product_id, "quantity": { "$gte": item.quantity } },
                    doc! {
                        "$inc": { "quantity": -item.quantity },
                        "$set": { "updated_at": now },
                    },
                )
                .session(&mut *session)
                .await?;

            if result.matched_count == 0 {
                let product = self
                    .products()
                    .find_one(doc! { "_id": item.product_id })
                    .session(&mut *session)
                    .await?
                    .ok_or_else(|| AppError::not_found(format!("Product {}", item.product_id)))?;
                return Err(AppError::InsufficientStock {
                    product: product.name,
                    requested: item.quantity,
                    available: product.quantity,
                });
            }
        }

        self.orders().insert_one(order).session(&mut *session).await?;
        self.transactions()
            .insert_one(transaction)
            .session(&mut *session)
            .await?;
        Ok(())
    }

    async fn fail_in_session(&self, session: &mut ClientSession, order_id: &ObjectId) -> Result<bool> {
        let now = BsonDateTime::from_chrono(Utc::now());

        let order = self
            .orders()
            .find_one_and_update(
                doc! { "_id": *order_id, "status": OrderStatus::Success.as_str() },
                doc! { "$set": { "status": OrderStatus::Failed.as_str(), "updated_at": now } },
            )
            .session(&mut *session)
            .await?;

        let Some(order) = order else {
            return Ok(false);
        };

        self.transactions()
            .update_many(
                doc! { "order_id": *order_id },
                doc! { "$set": { "status": TransactionStatus::Failed.as_str() } },
            )
            .session(&mut *session)
            .await?;

        for item in &order.items {
            self.products()
                .update_one(
                    doc! { "_id": item.product_id },
                    doc! {
                        "$inc": { "quantity": item.quantity },
                        "$set": { "updated_at": now },
                    },
                )
                .session(&mut *session)
                .await?;
        }
        Ok(true)
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error)) if write_error.code == 11000
    )
}

fn user_filter_doc(filter: &UserFilter) -> Document {
    let mut query = doc! {};
    if let Some(role) = filter.role {
        query.insert("role", role.as_str());
    }
    if let Some(roles) = &filter.roles {
        let roles: Vec<&str> = roles.iter().map(|r| r.as_str()).collect();
        query.insert("role", doc! { "$in": roles });
    }
    if let Some(approved) = filter.approved {
        query.insert("approved", approved);
    }
    query
}

fn product_filter_doc(filter: &ProductFilter) -> Document {
    let mut query = doc! {};
    if let Some(owner_id) = filter.owner_id {
        query.insert("owner_id", owner_id);
    }
    if let Some(product_type) = filter.product_type {
        query.insert("type", product_type.as_str());
    }
    if let Some(category) = &filter.category {
        query.insert("category", category.as_str());
    }
    if let Some(verified) = filter.verified {
        query.insert("verified", verified);
    }
    query
}

/// `$set` body for an owner edit. Absent fields are left alone.
fn product_update_doc(update: &UpdateProduct, now: BsonDateTime) -> Document {
    let mut changes = doc! { "updated_at": now };
    if let Some(name) = &update.name {
        changes.insert("name", name.trim());
    }
    if let Some(price) = update.price {
        changes.insert("price", price);
    }
    if let Some(quantity) = update.quantity {
        changes.insert("quantity", quantity);
    }
    if let Some(category) = &update.category {
        changes.insert("category", category.as_str());
    }
    if let Some(harvest_date) = update.harvest_date {
        changes.insert("harvest_date", harvest_date.to_string());
    }
    if let Some(image_url) = &update.image_url {
        changes.insert("image_url", image_url.as_str());
    }
    if let Some(certification) = &update.certification {
        changes.insert("certification", certification.as_str());
    }
    changes
}

fn order_filter_doc(filter: &OrderFilter) -> Document {
    let mut query = doc! {};
    if let Some(buyer_id) = filter.buyer_id {
        query.insert("buyer_id", buyer_id);
    }
    if let Some(seller_id) = filter.seller_id {
        query.insert("seller_id", seller_id);
    }
    if let Some(since) = filter.created_since {
        query.insert("created_at", doc! { "$gte": BsonDateTime::from_chrono(since) });
    }
    query
}

fn bson_count(value: Option<&Bson>) -> u64 {
    match value {
        Some(Bson::Int32(n)) => (*n).max(0) as u64,
        Some(Bson::Int64(n)) => (*n).max(0) as u64,
        Some(Bson::Double(n)) => n.max(0.0) as u64,
        _ => 0,
    }
}

#[async_trait]
impl MarketStore for MongoStore {
    async fn ping(&self) -> Result<()> {
        self.db.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }

    async fn insert_user(&self, user: &User) -> Result<()> {
        match self.users().insert_one(user).await {
            Ok(_) => Ok(()),
            Err(err) if is_duplicate_key(&err) => {
                Err(AppError::DuplicateKey(format!("phone {}", user.phone)))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn find_user(&self, id: &ObjectId) -> Result<Option<User>> {
        Ok(self.users().find_one(doc! { "_id": *id }).await?)
    }

    async fn find_user_by_phone(&self, phone: &str) -> Result<Option<User>> {
        Ok(self.users().find_one(doc! { "phone": phone }).await?)
    }

    async fn find_users(&self, ids: &[ObjectId]) -> Result<Vec<User>> {
        let cursor = self.users().find(doc! { "_id": { "$in": ids.to_vec() } }).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn list_users(&self, filter: &UserFilter) -> Result<Vec<User>> {
        let cursor = self
            .users()
            .find(user_filter_doc(filter))
            .sort(doc! { "created_at": -1, "_id": -1 })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn set_user_approved(&self, id: &ObjectId, approved: bool) -> Result<Option<User>> {
        let now = BsonDateTime::from_chrono(Utc::now());
        Ok(self
            .users()
            .find_one_and_update(
                doc! { "_id": *id },
                doc! { "$set": { "approved": approved, "updated_at": now } },
            )
            .return_document(mongodb::options::ReturnDocument::After)
            .await?)
    }

    async fn set_user_blocked(&self, id: &ObjectId, blocked: bool) -> Result<Option<User>> {
        let now = BsonDateTime::from_chrono(Utc::now());
        Ok(self
            .users()
            .find_one_and_update(
                doc! { "_id": *id },
                doc! { "$set": { "blocked": blocked, "updated_at": now } },
            )
            .return_document(mongodb::options::ReturnDocument::After)
            .await?)
    }

    async fn count_users(&self) -> Result<u64> {
        Ok(self.users().count_documents(doc! {}).await?)
    }

    async fn count_users_by_role(&self) -> Result<HashMap<Role, u64>> {
        let pipeline = vec![doc! { "$group": { "_id": "$role", "count": { "$sum": 1 } } }];
        let cursor = self.users().aggregate(pipeline).await?;
        let rows: Vec<Document> = cursor.try_collect().await?;

        let mut counts = HashMap::new();
        for row in rows {
            let Ok(raw_role) = row.get_str("_id") else {
                continue;
            };
            match raw_role.parse::<Role>() {
                Ok(role) => {
                    counts.insert(role, bson_count(row.get("count")));
                }
                Err(_) => warn!("Skipping users with unknown role '{}'", raw_role),
            }
        }
        Ok(counts)
    }

    async fn insert_product(&self, product: &Product) -> Result<()> {
        self.products().insert_one(product).await?;
        Ok(())
    }

    async fn find_product(&self, id: &ObjectId) -> Result<Option<Product>> {
        Ok(self.products().find_one(doc! { "_id": *id }).await?)
    }

    async fn find_products(&self, ids: &[ObjectId]) -> Result<Vec<Product>> {
        let cursor = self
            .products()
            .find(doc! { "_id": { "$in": ids.to_vec() } })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>> {
        let cursor = self
            .products()
            .find(product_filter_doc(filter))
            .sort(doc! { "created_at": -1, "_id": -1 })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn update_product(&self, id: &ObjectId, update: &UpdateProduct) -> Result<Option<Product>> {
        let changes = product_update_doc(update, BsonDateTime::from_chrono(Utc::now()));
        Ok(self
            .products()
            .find_one_and_update(doc! { "_id": *id }, doc! { "$set": changes })
            .return_document(mongodb::options::ReturnDocument::After)
            .await?)
    }

    async fn set_product_verified(&self, id: &ObjectId, verified: bool) -> Result<Option<Product>> {
        let now = BsonDateTime::from_chrono(Utc::now());
        Ok(self
            .products()
            .find_one_and_update(
                doc! { "_id": *id },
                doc! { "$set": { "verified": verified, "updated_at": now } },
            )
            .return_document(mongodb::options::ReturnDocument::After)
            .await?)
    }

    async fn delete_product(&self, id: &ObjectId) -> Result<bool> {
        let result = self.products().delete_one(doc! { "_id": *id }).await?;
        Ok(result.deleted_count > 0)
    }

    async fn count_products(&self) -> Result<u64> {
        Ok(self.products().count_documents(doc! {}).await?)
    }

    async fn commit_checkout(&self, order: &Order, transaction: &Transaction) -> Result<()> {
        let mut session = self.client.start_session().await?;
        session.start_transaction().await?;

        match self.checkout_in_session(&mut session, order, transaction).await {
            Ok(()) => {
                session.commit_transaction().await?;
                Ok(())
            }
            Err(err) => {
                if let Err(abort_err) = session.abort_transaction().await {
                    warn!("Failed to abort checkout transaction: {}", abort_err);
                }
                Err(err)
            }
        }
    }

    async fn fail_checkout(&self, order_id: &ObjectId) -> Result<bool> {
        let mut session = self.client.start_session().await?;
        session.start_transaction().await?;

        match self.fail_in_session(&mut session, order_id).await {
            Ok(changed) => {
                session.commit_transaction().await?;
                Ok(changed)
            }
            Err(err) => {
                if let Err(abort_err) = session.abort_transaction().await {
                    warn!("Failed to abort payment failure transaction: {}", abort_err);
                }
                Err(err)
            }
        }
    }

    async fn find_order(&self, id: &ObjectId) -> Result<Option<Order>> {
        Ok(self.orders().find_one(doc! { "_id": *id }).await?)
    }

    async fn list_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>> {
        let cursor = self
            .orders()
            .find(order_filter_doc(filter))
            .sort(doc! { "created_at": -1, "_id": -1 })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn update_order_status(
        &self,
        id: &ObjectId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<bool> {
        let now = BsonDateTime::from_chrono(Utc::now());
        let result = self
            .orders()
            .update_one(
                doc! { "_id": *id, "status": from.as_str() },
                doc! { "$set": { "status": to.as_str(), "updated_at": now } },
            )
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn count_orders(&self) -> Result<u64> {
        Ok(self.orders().count_documents(doc! {}).await?)
    }

    async fn total_revenue(&self) -> Result<f64> {
        let excluded: Vec<&str> = OrderStatus::NON_REVENUE.iter().map(|s| s.as_str()).collect();
        let pipeline = vec![
            doc! { "$match": { "status": { "$nin": excluded } } },
            doc! { "$group": { "_id": Bson::Null, "total": { "$sum": "$total_amount" } } },
        ];
        let cursor = self.orders().aggregate(pipeline).await?;
        let rows: Vec<Document> = cursor.try_collect().await?;

        Ok(rows
            .first()
            .and_then(|row| match row.get("total") {
                Some(Bson::Double(v)) => Some(*v),
                Some(Bson::Int32(v)) => Some(*v as f64),
                Some(Bson::Int64(v)) => Some(*v as f64),
                _ => None,
            })
            .unwrap_or(0.0))
    }

    async fn find_transaction_by_receipt(&self, receipt: &str) -> Result<Option<Transaction>> {
        Ok(self
            .transactions()
            .find_one(doc! { "mpesa_receipt": receipt })
            .await?)
    }
}
