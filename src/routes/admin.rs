use axum::{
    middleware,
    routing::{get, put},
    Router,
};

use crate::{handlers::admin::*, middleware::auth::auth_middleware, state::AppState};

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/stats", get(dashboard_stats))
        .route("/roles", get(role_counts))
        .route("/pending/:kind", get(pending_approvals))
        .route("/users", get(list_users))
        .route("/users/:id/approve", put(approve_user))
        .route("/users/:id/block", put(block_user))
        .route("/products/:id/verify", put(verify_product))
        .route("/orders", get(all_orders))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}
