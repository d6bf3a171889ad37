#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use bcrypt::hash;
use mongodb::bson::oid::ObjectId;
use serde_json::{json, Value};
use tower::ServiceExt;

use umoja_api::database::memory_store::MemoryStore;
use umoja_api::database::store::MarketStore;
use umoja_api::errors::Result;
use umoja_api::models::product::{CreateProduct, Product, ProductType};
use umoja_api::models::user::{Role, User};
use umoja_api::routes::build_router;
use umoja_api::services::auth_service::JwtKeys;
use umoja_api::services::sms_service::SmsSender;
use umoja_api::state::AppState;

pub const TEST_PASSWORD: &str = "shamba-secret";

/// Captures every SMS instead of sending it.
#[derive(Default)]
pub struct RecordingSms {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingSms {
    pub fn messages_to(&self, phone: &str) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(to, _)| to == phone)
            .map(|(_, body)| body.clone())
            .collect()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl SmsSender for RecordingSms {
    async fn send(&self, phone: &str, message: &str) -> Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((phone.to_string(), message.to_string()));
        Ok(())
    }
}

pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub sms: Arc<RecordingSms>,
    pub jwt: JwtKeys,
    pub state: AppState,
    pub router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let sms = Arc::new(RecordingSms::default());
        let jwt = JwtKeys::new("integration-secret", 1);
        let state = AppState::new(store.clone(), sms.clone(), jwt.clone());
        let router = build_router(state.clone());

        TestApp {
            store,
            sms,
            jwt,
            state,
            router,
        }
    }

    /// Inserts a user straight into the store. Sellers come back approved.
    pub async fn user(&self, name: &str, phone: &str, role: Role) -> User {
        let password_hash = hash(TEST_PASSWORD, 4).unwrap();
        let mut user = User::new(name.to_string(), phone.to_string(), password_hash, role);
        user.approved = true;
        self.store.insert_user(&user).await.unwrap();
        user
    }

    pub fn token(&self, user: &User) -> String {
        self.jwt.issue(user).unwrap()
    }

    /// Verified produce listing owned by `owner`.
    pub async fn product(&self, owner: &User, name: &str, price: f64, quantity: i64) -> Product {
        let mut product = Product::from_request(
            owner.id,
            Role::Farmer,
            CreateProduct {
                name: name.to_string(),
                price,
                quantity,
                product_type: ProductType::Produce,
                category: Some("vegetables".to_string()),
                harvest_date: None,
                image_url: None,
                certification: None,
            },
        );
        product.verified = true;
        self.store.insert_product(&product).await.unwrap();
        product
    }

    pub async fn stock_of(&self, product: &Product) -> i64 {
        self.store
            .find_product(&product.id)
            .await
            .unwrap()
            .map(|p| p.quantity)
            .unwrap_or_default()
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, value)
    }

    /// Places an order through the HTTP API and returns the response body.
    pub async fn place(&self, buyer_token: &str, lines: &[(&Product, i64)]) -> (StatusCode, Value) {
        let cart: Vec<Value> = lines
            .iter()
            .map(|(product, quantity)| {
                json!({
                    "_id": product.id.to_hex(),
                    "quantity": quantity,
                    "price": product.price,
                    "sellerId": product.owner_id.to_hex(),
                })
            })
            .collect();

        self.request(
            Method::POST,
            "/api/orders",
            Some(buyer_token),
            Some(json!({ "cartItems": cart })),
        )
        .await
    }
}

pub fn oid(value: &Value) -> ObjectId {
    ObjectId::parse_str(value.as_str().unwrap()).unwrap()
}
