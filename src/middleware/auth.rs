use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::database::store::MarketStore;
use crate::errors::{AppError, Result};
use crate::state::AppState;

pub async fn auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let token = headers
        .get("authorization")
        .and_then(|header| header.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .ok_or(AppError::AuthError)?;

    let claims = state.jwt.verify(token)?;

    // Tokens outlive account changes; blocking takes effect on the next request.
    let user = state
        .store
        .find_user(&claims.user_id()?)
        .await?
        .ok_or(AppError::AuthError)?;
    if user.blocked {
        return Err(AppError::forbidden("Account is blocked"));
    }

    // Insert claims into request extensions
    request.extensions_mut().insert(claims);

    Ok(next.run(request).await)
}
