use axum::{extract::State, http::StatusCode, response::Json, Extension};

use crate::errors::Result;
use crate::models::user::{AuthResponse, Claims, LoginUser, RegisterUser, UserResponse};
use crate::state::AppState;

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterUser>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    let response = state.auth().register(payload).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginUser>,
) -> Result<Json<AuthResponse>> {
    Ok(Json(state.auth().login(payload).await?))
}

pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<UserResponse>> {
    Ok(Json(state.auth().current_user(&claims).await?))
}
