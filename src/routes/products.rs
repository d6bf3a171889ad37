use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::{handlers::products::*, middleware::auth::auth_middleware, state::AppState};

pub fn routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/", post(create_product))
        .route("/mine", get(my_products))
        .route("/:id", put(update_product).delete(delete_product))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        .route("/", get(list_products))
        .route("/:id", get(get_product))
        .merge(protected)
}
