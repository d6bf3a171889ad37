use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    Extension,
};
use serde_json::{json, Value};

use crate::errors::Result;
use crate::models::product::{CreateProduct, ProductQuery, ProductResponse, UpdateProduct};
use crate::models::user::Claims;
use crate::state::AppState;

pub async fn create_product(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateProduct>,
) -> Result<(StatusCode, Json<ProductResponse>)> {
    let product = state.products().create(&claims, payload).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<Vec<ProductResponse>>> {
    Ok(Json(state.products().list_public(query).await?))
}

pub async fn my_products(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<ProductResponse>>> {
    Ok(Json(state.products().list_mine(&claims).await?))
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> Result<Json<ProductResponse>> {
    Ok(Json(state.products().get(&product_id).await?))
}

pub async fn update_product(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(product_id): Path<String>,
    Json(payload): Json<UpdateProduct>,
) -> Result<Json<ProductResponse>> {
    Ok(Json(
        state.products().update(&claims, &product_id, payload).await?,
    ))
}

pub async fn delete_product(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(product_id): Path<String>,
) -> Result<Json<Value>> {
    state.products().delete(&claims, &product_id).await?;
    Ok(Json(json!({ "msg": "Product deleted", "success": true })))
}
