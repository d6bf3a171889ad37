use axum::{
    extract::{Path, Query, State},
    response::Json,
    Extension,
};

use crate::dtos::admin_dtos::{
    ApproveUserRequest, BlockUserRequest, DashboardStats, PendingApprovals, RoleCounts,
};
use crate::errors::Result;
use crate::models::order::OrderResponse;
use crate::models::product::{ProductResponse, VerifyProductRequest};
use crate::models::user::{Claims, Role, UserListQuery, UserResponse};
use crate::state::AppState;

fn require_admin(claims: &Claims) -> Result<()> {
    claims.require_role(&[Role::Admin])
}

pub async fn dashboard_stats(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<DashboardStats>> {
    require_admin(&claims)?;
    Ok(Json(state.admin().dashboard_stats().await?))
}

pub async fn role_counts(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<RoleCounts>> {
    require_admin(&claims)?;
    Ok(Json(state.admin().role_counts().await?))
}

pub async fn pending_approvals(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(kind): Path<String>,
) -> Result<Json<PendingApprovals>> {
    require_admin(&claims)?;
    Ok(Json(state.admin().pending(&kind).await?))
}

pub async fn list_users(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<UserListQuery>,
) -> Result<Json<Vec<UserResponse>>> {
    require_admin(&claims)?;
    Ok(Json(state.admin().list_users(query.role.as_deref()).await?))
}

pub async fn approve_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(user_id): Path<String>,
    Json(payload): Json<ApproveUserRequest>,
) -> Result<Json<UserResponse>> {
    require_admin(&claims)?;
    Ok(Json(
        state
            .admin()
            .set_user_approved(&user_id, payload.approved)
            .await?,
    ))
}

pub async fn block_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(user_id): Path<String>,
    Json(payload): Json<BlockUserRequest>,
) -> Result<Json<UserResponse>> {
    require_admin(&claims)?;
    Ok(Json(
        state.admin().set_user_blocked(&user_id, payload.blocked).await?,
    ))
}

pub async fn verify_product(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(product_id): Path<String>,
    Json(payload): Json<VerifyProductRequest>,
) -> Result<Json<ProductResponse>> {
    require_admin(&claims)?;
    Ok(Json(
        state
            .admin()
            .set_product_verified(&product_id, payload.verified)
            .await?,
    ))
}

pub async fn all_orders(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<OrderResponse>>> {
    require_admin(&claims)?;
    Ok(Json(state.admin().all_orders().await?))
}
