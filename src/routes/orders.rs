use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

use crate::{handlers::orders::*, middleware::auth::auth_middleware, state::AppState};

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", post(place_order))
        .route("/mine", get(my_orders))
        .route("/farmer/:id", get(seller_orders))
        .route("/farmer/:id/customers", get(seller_customers))
        .route("/farmer/:id/stats", get(seller_stats))
        .route("/:id/status", patch(update_order_status))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}
