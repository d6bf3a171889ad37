use axum::{http::Method, routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers::health::{api_health_check, health_check, root_handler};
use crate::state::AppState;

pub mod admin;
pub mod auth;
pub mod orders;
pub mod payments;
pub mod products;

pub fn build_router(app_state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any)
        .allow_credentials(false);

    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_check))
        .route("/api/health", get(api_health_check))
        .nest("/api/auth", auth::routes(app_state.clone()))
        .nest("/api/products", products::routes(app_state.clone()))
        .nest("/api/orders", orders::routes(app_state.clone()))
        .nest("/api/payments", payments::routes(app_state.clone()))
        .nest("/api/admin", admin::routes(app_state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}
