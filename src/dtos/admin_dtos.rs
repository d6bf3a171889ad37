use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::product::ProductResponse;
use crate::models::user::UserResponse;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_users: u64,
    pub total_products: u64,
    pub total_orders: u64,
    pub total_revenue: f64,
}

/// Keyed by role name; every role is present, zero when nobody holds it.
pub type RoleCounts = BTreeMap<String, u64>;

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum PendingApprovals {
    Users(Vec<UserResponse>),
    Products(Vec<ProductResponse>),
}

#[derive(Debug, Deserialize)]
pub struct ApproveUserRequest {
    pub approved: bool,
}

#[derive(Debug, Deserialize)]
pub struct BlockUserRequest {
    pub blocked: bool,
}
