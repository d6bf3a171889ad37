pub mod admin_service;
pub mod auth_service;
pub mod order_queries;
pub mod order_service;
pub mod payment_service;
pub mod product_service;
pub mod sms_service;
