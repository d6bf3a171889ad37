mod common;

use axum::http::{Method, StatusCode};
use serde_json::{json, Value};

use common::{oid, TestApp};
use umoja_api::database::store::MarketStore;
use umoja_api::models::order::OrderStatus;
use umoja_api::models::transaction::TransactionStatus;
use umoja_api::models::user::Role;

fn stk_callback(receipt: &str, result_code: i32, desc: &str) -> Value {
    json!({
        "Body": {
            "stkCallback": {
                "MerchantRequestID": "29115-34620561-1",
                "CheckoutRequestID": receipt,
                "ResultCode": result_code,
                "ResultDesc": desc
            }
        }
    })
}

#[tokio::test]
async fn failed_payment_reverts_order_transaction_and_stock() {
    let app = TestApp::new();
    let farmer = app.user("Wanjiru", "0711000001", Role::Farmer).await;
    let buyer = app.user("Otieno", "0722000001", Role::Buyer).await;
    let maize = app.product(&farmer, "Maize", 100.0, 10).await;

    let (_, placed) = app.place(&app.token(&buyer), &[(&maize, 4)]).await;
    let receipt = placed["order"]["transactionId"].as_str().unwrap().to_string();
    let order_id = oid(&placed["order"]["_id"]);
    assert_eq!(app.stock_of(&maize).await, 6);

    let (status, body) = app
        .request(
            Method::POST,
            "/api/payments/callback",
            None,
            Some(stk_callback(&receipt, 1032, "Request cancelled by user")),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "ResultCode": 0, "ResultDesc": "Accepted" }));

    let order = app.store.find_order(&order_id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Failed);

    let transaction = app
        .store
        .find_transaction_by_receipt(&receipt)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(transaction.status, TransactionStatus::Failed);
    assert_eq!(app.stock_of(&maize).await, 10);

    let to_buyer = app.sms.messages_to(&buyer.phone);
    assert!(to_buyer.iter().any(|m| m.contains("failed")));
}

#[tokio::test]
async fn repeated_failure_callback_restores_stock_once() {
    let app = TestApp::new();
    let farmer = app.user("Wanjiru", "0711000001", Role::Farmer).await;
    let buyer = app.user("Otieno", "0722000001", Role::Buyer).await;
    let maize = app.product(&farmer, "Maize", 100.0, 10).await;

    let (_, placed) = app.place(&app.token(&buyer), &[(&maize, 4)]).await;
    let receipt = placed["order"]["transactionId"].as_str().unwrap().to_string();

    for _ in 0..2 {
        let (status, _) = app
            .request(
                Method::POST,
                "/api/payments/callback",
                None,
                Some(stk_callback(&receipt, 1, "Insufficient funds")),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    assert_eq!(app.stock_of(&maize).await, 10);
}

#[tokio::test]
async fn successful_callback_leaves_the_order_untouched() {
    let app = TestApp::new();
    let farmer = app.user("Wanjiru", "0711000001", Role::Farmer).await;
    let buyer = app.user("Otieno", "0722000001", Role::Buyer).await;
    let maize = app.product(&farmer, "Maize", 100.0, 10).await;

    let (_, placed) = app.place(&app.token(&buyer), &[(&maize, 2)]).await;
    let receipt = placed["order"]["transactionId"].as_str().unwrap().to_string();
    let order_id = oid(&placed["order"]["_id"]);

    let (status, _) = app
        .request(
            Method::POST,
            "/api/payments/callback",
            None,
            Some(stk_callback(&receipt, 0, "The service request is processed successfully.")),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    let order = app.store.find_order(&order_id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Success);
    assert_eq!(app.stock_of(&maize).await, 8);
}

#[tokio::test]
async fn failure_after_acceptance_does_not_revert() {
    let app = TestApp::new();
    let farmer = app.user("Wanjiru", "0711000001", Role::Farmer).await;
    let buyer = app.user("Otieno", "0722000001", Role::Buyer).await;
    let maize = app.product(&farmer, "Maize", 100.0, 10).await;

    let (_, placed) = app.place(&app.token(&buyer), &[(&maize, 2)]).await;
    let receipt = placed["order"]["transactionId"].as_str().unwrap().to_string();
    let order_id = oid(&placed["order"]["_id"]);

    let (status, _) = app
        .request(
            Method::PATCH,
            &format!("/api/orders/{}/status", order_id.to_hex()),
            Some(&app.token(&farmer)),
            Some(json!({ "status": "accepted" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    app.request(
        Method::POST,
        "/api/payments/callback",
        None,
        Some(stk_callback(&receipt, 1, "Insufficient funds")),
    )
    .await;

    let order = app.store.find_order(&order_id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Accepted);
    assert_eq!(app.stock_of(&maize).await, 8);
}

#[tokio::test]
async fn unknown_receipt_is_still_acknowledged() {
    let app = TestApp::new();

    let (status, body) = app
        .request(
            Method::POST,
            "/api/payments/callback",
            None,
            Some(stk_callback("UMJ20260101000000ABCDEF", 1, "Failed")),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ResultCode"], 0);
}

#[tokio::test]
async fn receipt_lookup_is_limited_to_the_parties() {
    let app = TestApp::new();
    let farmer = app.user("Wanjiru", "0711000001", Role::Farmer).await;
    let buyer = app.user("Otieno", "0722000001", Role::Buyer).await;
    let stranger = app.user("Mwangi", "0722000009", Role::Buyer).await;
    let admin = app.user("Admin", "0700000000", Role::Admin).await;
    let maize = app.product(&farmer, "Maize", 100.0, 10).await;

    let (_, placed) = app.place(&app.token(&buyer), &[(&maize, 3)]).await;
    let receipt = placed["order"]["transactionId"].as_str().unwrap().to_string();
    let uri = format!("/api/payments/{}", receipt);

    for user in [&buyer, &farmer, &admin] {
        let (status, body) = app.request(Method::GET, &uri, Some(&app.token(user)), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["mpesaReceipt"], receipt.as_str());
        assert_eq!(body["amount"].as_f64().unwrap(), 300.0);
        assert_eq!(body["status"], "success");
        assert_eq!(body["orderId"], placed["order"]["_id"]);
    }

    let (status, _) = app
        .request(Method::GET, &uri, Some(&app.token(&stranger)), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .request(Method::GET, "/api/payments/UMJ-missing", Some(&app.token(&admin)), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
