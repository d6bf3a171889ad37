use std::sync::Arc;

use mongodb::bson::oid::ObjectId;
use tracing::info;

use crate::database::store::{MarketStore, OrderFilter, ProductFilter, UserFilter};
use crate::dtos::admin_dtos::{DashboardStats, PendingApprovals, RoleCounts};
use crate::errors::{AppError, Result};
use crate::models::order::OrderResponse;
use crate::models::product::ProductResponse;
use crate::models::user::{Role, UserResponse};

#[derive(Clone)]
pub struct AdminService {
    store: Arc<dyn MarketStore>,
}

impl AdminService {
    pub fn new(store: Arc<dyn MarketStore>) -> Self {
        AdminService { store }
    }

    pub async fn dashboard_stats(&self) -> Result<DashboardStats> {
        Ok(DashboardStats {
            total_users: self.store.count_users().await?,
            total_products: self.store.count_products().await?,
            total_orders: self.store.count_orders().await?,
            total_revenue: self.store.total_revenue().await?,
        })
    }

    pub async fn role_counts(&self) -> Result<RoleCounts> {
        let counts = self.store.count_users_by_role().await?;
        Ok(Role::ALL
            .iter()
            .map(|role| (role.to_string(), counts.get(role).copied().unwrap_or(0)))
            .collect())
    }

    pub async fn pending(&self, kind: &str) -> Result<PendingApprovals> {
        match kind {
            "users" => {
                let users = self
                    .store
                    .list_users(&UserFilter {
                        roles: Some(vec![Role::Farmer, Role::Supplier]),
                        approved: Some(false),
                        ..Default::default()
                    })
                    .await?;
                Ok(PendingApprovals::Users(
                    users.into_iter().map(UserResponse::from).collect(),
                ))
            }
            "products" => {
                let products = self
                    .store
                    .list_products(&ProductFilter {
                        verified: Some(false),
                        ..Default::default()
                    })
                    .await?;
                Ok(PendingApprovals::Products(
                    products.into_iter().map(ProductResponse::from).collect(),
                ))
            }
            other => Err(AppError::invalid_input(format!(
                "Unknown approval type '{}', expected 'users' or 'products'",
                other
            ))),
        }
    }

    pub async fn list_users(&self, role: Option<&str>) -> Result<Vec<UserResponse>> {
        let filter = UserFilter {
            role: role.map(str::parse).transpose()?,
            ..Default::default()
        };
        let users = self.store.list_users(&filter).await?;
        Ok(users.into_iter().map(UserResponse::from).collect())
    }

    pub async fn set_user_approved(&self, user_id: &str, approved: bool) -> Result<UserResponse> {
        let id = ObjectId::parse_str(user_id)?;
        let user = self
            .store
            .set_user_approved(&id, approved)
            .await?
            .ok_or_else(|| AppError::not_found("User"))?;
        info!("🛡️ User {} approval set to {}", user_id, approved);
        Ok(user.into())
    }

    pub async fn set_user_blocked(&self, user_id: &str, blocked: bool) -> Result<UserResponse> {
        let id = ObjectId::parse_str(user_id)?;
        let existing = self
            .store
            .find_user(&id)
            .await?
            .ok_or_else(|| AppError::not_found("User"))?;
        if existing.role == Role::Admin && blocked {
            return Err(AppError::forbidden("Admins cannot be blocked"));
        }

        let user = self
            .store
            .set_user_blocked(&id, blocked)
            .await?
            .ok_or_else(|| AppError::not_found("User"))?;
        info!("🛡️ User {} blocked set to {}", user_id, blocked);
        Ok(user.into())
    }

    pub async fn set_product_verified(&self, product_id: &str, verified: bool) -> Result<ProductResponse> {
        let id = ObjectId::parse_str(product_id)?;
        let product = self
            .store
            .set_product_verified(&id, verified)
            .await?
            .ok_or_else(|| AppError::not_found("Product"))?;
        info!("🛡️ Product {} verified set to {}", product_id, verified);
        Ok(product.into())
    }

    pub async fn all_orders(&self) -> Result<Vec<OrderResponse>> {
        let orders = self.store.list_orders(&OrderFilter::default()).await?;
        Ok(orders.into_iter().map(OrderResponse::from).collect())
    }
}
