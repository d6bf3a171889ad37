use std::sync::Arc;

use crate::database::store::MarketStore;
use crate::services::admin_service::AdminService;
use crate::services::auth_service::{AuthService, JwtKeys};
use crate::services::order_queries::OrderQueries;
use crate::services::order_service::OrderService;
use crate::services::payment_service::PaymentService;
use crate::services::product_service::ProductService;
use crate::services::sms_service::{Notifier, SmsSender};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn MarketStore>,
    pub notifier: Notifier,
    pub jwt: JwtKeys,
}

impl AppState {
    pub fn new(store: Arc<dyn MarketStore>, sms: Arc<dyn SmsSender>, jwt: JwtKeys) -> Self {
        AppState {
            store,
            notifier: Notifier::new(sms),
            jwt,
        }
    }

    pub fn auth(&self) -> AuthService {
        AuthService::new(self.store.clone(), self.jwt.clone())
    }

    pub fn products(&self) -> ProductService {
        ProductService::new(self.store.clone())
    }

    pub fn orders(&self) -> OrderService {
        OrderService::new(self.store.clone(), self.notifier.clone())
    }

    pub fn order_queries(&self) -> OrderQueries {
        OrderQueries::new(self.store.clone())
    }

    pub fn payments(&self) -> PaymentService {
        PaymentService::new(self.store.clone(), self.notifier.clone())
    }

    pub fn admin(&self) -> AdminService {
        AdminService::new(self.store.clone())
    }
}
