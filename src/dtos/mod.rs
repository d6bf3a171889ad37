pub mod admin_dtos;
pub mod order_dtos;
