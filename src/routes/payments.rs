use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::{handlers::payments::*, middleware::auth::auth_middleware, state::AppState};

pub fn routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/:receipt", get(get_transaction))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        .route("/callback", post(mpesa_callback))
        .merge(protected)
}
