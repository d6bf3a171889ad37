// handlers/payments.rs
use axum::{
    extract::{Path, State},
    response::Json,
    Extension,
};
use serde_json::{json, Value};
use tracing::{error, info};

use crate::errors::Result;
use crate::models::payment::MpesaCallback;
use crate::models::transaction::TransactionResponse;
use crate::models::user::Claims;
use crate::state::AppState;

/// Gateway-facing: always acknowledges, whatever happened on our side.
pub async fn mpesa_callback(
    State(state): State<AppState>,
    Json(payload): Json<MpesaCallback>,
) -> Json<Value> {
    let callback = payload.body.stk_callback;
    info!(
        "Received M-Pesa callback: receipt={} code={} desc={}",
        callback.checkout_request_id, callback.result_code, callback.result_desc
    );

    match state.payments().handle_callback(&callback).await {
        Ok(outcome) => info!(
            "Callback for {} handled: {}",
            callback.checkout_request_id,
            outcome.as_str()
        ),
        Err(e) => error!(
            "Failed to process callback for {}: {}",
            callback.checkout_request_id, e
        ),
    }

    Json(json!({
        "ResultCode": 0,
        "ResultDesc": "Accepted"
    }))
}

pub async fn get_transaction(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(receipt): Path<String>,
) -> Result<Json<TransactionResponse>> {
    let transaction = state.payments().transaction_for(&claims, &receipt).await?;
    Ok(Json(transaction.into()))
}
