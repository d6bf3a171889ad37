use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    Extension,
};

use crate::dtos::order_dtos::{BuyerOrderView, CustomerView, SellerOrderView, SellerStats};
use crate::errors::Result;
use crate::models::order::{
    CartRequest, OrderResponse, PlaceOrderResponse, StatsQuery, UpdateOrderStatus,
};
use crate::models::user::{Claims, Role};
use crate::services::order_queries::OrderQueries;
use crate::state::AppState;

pub async fn place_order(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(cart): Json<CartRequest>,
) -> Result<(StatusCode, Json<PlaceOrderResponse>)> {
    claims.require_role(&[Role::Buyer])?;

    let placed = state.orders().place_order(claims.user_id()?, cart).await?;

    Ok((
        StatusCode::CREATED,
        Json(PlaceOrderResponse {
            msg: "Order placed successfully".to_string(),
            order: placed.order.into(),
        }),
    ))
}

pub async fn my_orders(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<BuyerOrderView>>> {
    Ok(Json(state.order_queries().buyer_orders(claims.user_id()?).await?))
}

pub async fn seller_orders(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(seller_id): Path<String>,
) -> Result<Json<Vec<SellerOrderView>>> {
    let seller_id = OrderQueries::authorize_seller_view(&claims, &seller_id)?;
    Ok(Json(state.order_queries().seller_orders(seller_id).await?))
}

pub async fn seller_customers(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(seller_id): Path<String>,
) -> Result<Json<Vec<CustomerView>>> {
    let seller_id = OrderQueries::authorize_seller_view(&claims, &seller_id)?;
    Ok(Json(state.order_queries().unique_customers(seller_id).await?))
}

pub async fn seller_stats(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(seller_id): Path<String>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<SellerStats>> {
    let seller_id = OrderQueries::authorize_seller_view(&claims, &seller_id)?;
    Ok(Json(
        state
            .order_queries()
            .seller_stats(seller_id, query.days)
            .await?,
    ))
}

pub async fn update_order_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(order_id): Path<String>,
    Json(payload): Json<UpdateOrderStatus>,
) -> Result<Json<OrderResponse>> {
    let order = state
        .orders()
        .update_status(&claims, &order_id, &payload.status)
        .await?;
    Ok(Json(order.into()))
}
