pub mod order;
pub mod payment;
pub mod product;
pub mod transaction;
pub mod user;
