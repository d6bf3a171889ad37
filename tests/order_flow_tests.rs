mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

use common::{oid, TestApp};
use umoja_api::database::store::{MarketStore, OrderFilter};
use umoja_api::models::order::OrderStatus;
use umoja_api::models::transaction::TransactionStatus;
use umoja_api::models::user::Role;

#[tokio::test]
async fn checkout_creates_one_order_and_one_matching_transaction() {
    let app = TestApp::new();
    let farmer = app.user("Wanjiru", "0711000001", Role::Farmer).await;
    let buyer = app.user("Otieno", "0722000001", Role::Buyer).await;
    let kale = app.product(&farmer, "Kale", 40.0, 100).await;
    let tomatoes = app.product(&farmer, "Tomatoes", 120.0, 50).await;
    let onions = app.product(&farmer, "Onions", 75.5, 30).await;

    let (status, body) = app
        .place(&app.token(&buyer), &[(&kale, 3), (&tomatoes, 2), (&onions, 4)])
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["msg"], "Order placed successfully");

    let order = &body["order"];
    assert_eq!(order["items"].as_array().unwrap().len(), 3);
    assert_eq!(order["status"], "success");
    assert_eq!(order["paymentMethod"], "M-Pesa");
    assert_eq!(order["sellerId"], farmer.id.to_hex());
    assert_eq!(order["buyerId"], buyer.id.to_hex());

    let expected = 3.0 * 40.0 + 2.0 * 120.0 + 4.0 * 75.5;
    assert_eq!(order["totalAmount"].as_f64().unwrap(), expected);

    let order_id = oid(&order["_id"]);
    let transactions = app.store.transactions_for_order(&order_id).await;
    assert_eq!(transactions.len(), 1);
    assert_eq!(app.store.transaction_count().await, 1);

    let transaction = &transactions[0];
    assert_eq!(transaction.amount, expected);
    assert_eq!(transaction.order_id, order_id);
    assert_eq!(transaction.status, TransactionStatus::Success);
    assert_eq!(order["transactionId"], transaction.mpesa_receipt.as_str());
    assert!(transaction.mpesa_receipt.starts_with("UMJ"));
    assert_eq!(transaction.mpesa_receipt.len(), 3 + 14 + 6);

    let stored = app.store.find_order(&order_id).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::Success);
    assert_eq!(stored.transaction_id.as_deref(), Some(transaction.mpesa_receipt.as_str()));
}

#[tokio::test]
async fn empty_cart_is_rejected_without_writing() {
    let app = TestApp::new();
    let buyer = app.user("Otieno", "0722000001", Role::Buyer).await;

    let (status, body) = app
        .request(
            Method::POST,
            "/api/orders",
            Some(&app.token(&buyer)),
            Some(json!({ "cartItems": [] })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(app.store.count_orders().await.unwrap(), 0);
    assert_eq!(app.store.transaction_count().await, 0);
}

#[tokio::test]
async fn missing_cart_field_counts_as_empty() {
    let app = TestApp::new();
    let buyer = app.user("Otieno", "0722000001", Role::Buyer).await;

    let (status, _) = app
        .request(Method::POST, "/api/orders", Some(&app.token(&buyer)), Some(json!({})))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.store.count_orders().await.unwrap(), 0);
}

#[tokio::test]
async fn single_line_cart_produces_expected_order() {
    let app = TestApp::new();
    let farmer = app.user("Wanjiru", "0711000001", Role::Farmer).await;
    let buyer = app.user("Otieno", "0722000001", Role::Buyer).await;
    let maize = app.product(&farmer, "Maize", 100.0, 10).await;

    let (status, body) = app.place(&app.token(&buyer), &[(&maize, 2)]).await;

    assert_eq!(status, StatusCode::CREATED);
    let order = &body["order"];
    let items = order["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["productId"], maize.id.to_hex());
    assert_eq!(items[0]["quantity"], 2);
    assert_eq!(order["totalAmount"].as_f64().unwrap(), 200.0);
    assert_eq!(order["status"], "success");
}

#[tokio::test]
async fn resubmitting_the_same_cart_creates_independent_orders() {
    let app = TestApp::new();
    let farmer = app.user("Wanjiru", "0711000001", Role::Farmer).await;
    let buyer = app.user("Otieno", "0722000001", Role::Buyer).await;
    let maize = app.product(&farmer, "Maize", 100.0, 10).await;
    let token = app.token(&buyer);

    let (_, first) = app.place(&token, &[(&maize, 1)]).await;
    let (_, second) = app.place(&token, &[(&maize, 1)]).await;

    assert_ne!(first["order"]["_id"], second["order"]["_id"]);
    assert_ne!(first["order"]["transactionId"], second["order"]["transactionId"]);
    assert_eq!(app.store.count_orders().await.unwrap(), 2);
    assert_eq!(app.store.transaction_count().await, 2);
    assert_eq!(app.stock_of(&maize).await, 8);
}

#[tokio::test]
async fn checkout_decrements_stock() {
    let app = TestApp::new();
    let farmer = app.user("Wanjiru", "0711000001", Role::Farmer).await;
    let buyer = app.user("Otieno", "0722000001", Role::Buyer).await;
    let beans = app.product(&farmer, "Beans", 150.0, 12).await;

    let (status, _) = app.place(&app.token(&buyer), &[(&beans, 5)]).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(app.stock_of(&beans).await, 7);
}

#[tokio::test]
async fn ordering_more_than_stock_writes_nothing() {
    let app = TestApp::new();
    let farmer = app.user("Wanjiru", "0711000001", Role::Farmer).await;
    let buyer = app.user("Otieno", "0722000001", Role::Buyer).await;
    let beans = app.product(&farmer, "Beans", 150.0, 12).await;
    let kale = app.product(&farmer, "Kale", 40.0, 3).await;

    let (status, body) = app
        .place(&app.token(&buyer), &[(&beans, 2), (&kale, 4)])
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
    assert_eq!(app.stock_of(&beans).await, 12);
    assert_eq!(app.stock_of(&kale).await, 3);
    assert_eq!(app.store.count_orders().await.unwrap(), 0);
    assert_eq!(app.store.transaction_count().await, 0);
}

#[tokio::test]
async fn repeated_lines_are_checked_against_stock_together() {
    let app = TestApp::new();
    let farmer = app.user("Wanjiru", "0711000001", Role::Farmer).await;
    let buyer = app.user("Otieno", "0722000001", Role::Buyer).await;
    let kale = app.product(&farmer, "Kale", 40.0, 5).await;

    let (status, _) = app
        .place(&app.token(&buyer), &[(&kale, 3), (&kale, 3)])
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(app.stock_of(&kale).await, 5);
}

#[tokio::test]
async fn tampered_client_price_is_ignored() {
    let app = TestApp::new();
    let farmer = app.user("Wanjiru", "0711000001", Role::Farmer).await;
    let buyer = app.user("Otieno", "0722000001", Role::Buyer).await;
    let maize = app.product(&farmer, "Maize", 100.0, 10).await;

    let (status, body) = app
        .request(
            Method::POST,
            "/api/orders",
            Some(&app.token(&buyer)),
            Some(json!({
                "cartItems": [
                    { "_id": maize.id.to_hex(), "quantity": 2, "price": 1.0 }
                ]
            })),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["order"]["totalAmount"].as_f64().unwrap(), 200.0);
    assert_eq!(body["order"]["items"][0]["price"].as_f64().unwrap(), 100.0);
}

#[tokio::test]
async fn cart_spanning_two_sellers_is_rejected() {
    let app = TestApp::new();
    let wanjiru = app.user("Wanjiru", "0711000001", Role::Farmer).await;
    let kiprop = app.user("Kiprop", "0711000002", Role::Farmer).await;
    let buyer = app.user("Otieno", "0722000001", Role::Buyer).await;
    let kale = app.product(&wanjiru, "Kale", 40.0, 10).await;
    let milk = app.product(&kiprop, "Milk", 60.0, 10).await;

    let (status, _) = app.place(&app.token(&buyer), &[(&kale, 1), (&milk, 1)]).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.store.count_orders().await.unwrap(), 0);
    assert_eq!(app.stock_of(&kale).await, 10);
}

#[tokio::test]
async fn unknown_and_unverified_products_cannot_be_ordered() {
    let app = TestApp::new();
    let farmer = app.user("Wanjiru", "0711000001", Role::Farmer).await;
    let buyer = app.user("Otieno", "0722000001", Role::Buyer).await;
    let token = app.token(&buyer);

    let (status, _) = app
        .request(
            Method::POST,
            "/api/orders",
            Some(&token),
            Some(json!({ "cartItems": [{ "_id": mongodb::bson::oid::ObjectId::new().to_hex(), "quantity": 1 }] })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .request(
            Method::POST,
            "/api/orders",
            Some(&token),
            Some(json!({ "cartItems": [{ "_id": "not-an-id", "quantity": 1 }] })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let hidden = app.product(&farmer, "Seed potatoes", 300.0, 10).await;
    app.store.set_product_verified(&hidden.id, false).await.unwrap();

    let (status, _) = app.place(&token, &[(&hidden, 1)]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.store.count_orders().await.unwrap(), 0);
}

#[tokio::test]
async fn zero_quantity_line_is_rejected() {
    let app = TestApp::new();
    let farmer = app.user("Wanjiru", "0711000001", Role::Farmer).await;
    let buyer = app.user("Otieno", "0722000001", Role::Buyer).await;
    let maize = app.product(&farmer, "Maize", 100.0, 10).await;

    let (status, _) = app.place(&app.token(&buyer), &[(&maize, 0)]).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.stock_of(&maize).await, 10);
}

#[tokio::test]
async fn only_buyers_can_check_out() {
    let app = TestApp::new();
    let farmer = app.user("Wanjiru", "0711000001", Role::Farmer).await;
    let other = app.user("Kiprop", "0711000002", Role::Farmer).await;
    let maize = app.product(&farmer, "Maize", 100.0, 10).await;

    let (status, _) = app.place(&app.token(&other), &[(&maize, 1)]).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(app.store.count_orders().await.unwrap(), 0);
}

#[tokio::test]
async fn checkout_requires_a_token() {
    let app = TestApp::new();

    let (status, body) = app
        .request(Method::POST, "/api/orders", None, Some(json!({ "cartItems": [] })))
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn blocked_buyer_cannot_check_out() {
    let app = TestApp::new();
    let farmer = app.user("Wanjiru", "0711000001", Role::Farmer).await;
    let buyer = app.user("Otieno", "0722000001", Role::Buyer).await;
    let maize = app.product(&farmer, "Maize", 100.0, 10).await;
    app.store.set_user_blocked(&buyer.id, true).await.unwrap();

    let (status, _) = app.place(&app.token(&buyer), &[(&maize, 1)]).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn checkout_notifies_buyer_and_seller() {
    let app = TestApp::new();
    let farmer = app.user("Wanjiru", "0711000001", Role::Farmer).await;
    let buyer = app.user("Otieno", "0722000001", Role::Buyer).await;
    let maize = app.product(&farmer, "Maize", 100.0, 10).await;

    let (_, body) = app.place(&app.token(&buyer), &[(&maize, 1)]).await;
    let receipt = body["order"]["transactionId"].as_str().unwrap().to_string();

    let to_buyer = app.sms.messages_to(&buyer.phone);
    assert_eq!(to_buyer.len(), 1);
    assert!(to_buyer[0].contains(&receipt));
    assert_eq!(app.sms.messages_to(&farmer.phone).len(), 1);
}

#[tokio::test]
async fn all_orders_are_visible_in_the_store() {
    let app = TestApp::new();
    let farmer = app.user("Wanjiru", "0711000001", Role::Farmer).await;
    let buyer = app.user("Otieno", "0722000001", Role::Buyer).await;
    let maize = app.product(&farmer, "Maize", 100.0, 10).await;
    app.place(&app.token(&buyer), &[(&maize, 1)]).await;

    let orders = app
        .store
        .list_orders(&OrderFilter {
            seller_id: Some(farmer.id),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].buyer_id, buyer.id);
}
