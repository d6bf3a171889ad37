//! Checkout and seller-driven order status changes.
//!
//! Checkout re-prices every cart line from the stored product, enforces a
//! single seller per order, and hands the order, its transaction and the
//! stock decrements to the store as one atomic write. Notifications go out
//! only after that write has landed and can never fail the request.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use tracing::{info, warn};
use uuid::Uuid;

use crate::database::store::MarketStore;
use crate::errors::{AppError, Result};
use crate::models::order::{CartRequest, Order, OrderItem, OrderStatus};
use crate::models::product::Product;
use crate::models::transaction::Transaction;
use crate::models::user::{Claims, User};
use crate::services::sms_service::Notifier;

const RECEIPT_PREFIX: &str = "UMJ";
const PRICE_TOLERANCE: f64 = 0.005;

#[derive(Debug, Clone)]
pub struct PlacedOrder {
    pub order: Order,
    pub transaction: Transaction,
}

/// Synthetic M-Pesa style receipt: prefix, UTC timestamp, six random hex digits.
pub fn generate_receipt(now: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!(
        "{}{}{}",
        RECEIPT_PREFIX,
        now.format("%Y%m%d%H%M%S"),
        suffix[..6].to_uppercase()
    )
}

#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn MarketStore>,
    notifier: Notifier,
}

impl OrderService {
    pub fn new(store: Arc<dyn MarketStore>, notifier: Notifier) -> Self {
        OrderService { store, notifier }
    }

    pub async fn place_order(&self, buyer_id: ObjectId, cart: CartRequest) -> Result<PlacedOrder> {
        if cart.cart_items.is_empty() {
            return Err(AppError::invalid_input("Cart is empty"));
        }

        let mut product_ids = Vec::with_capacity(cart.cart_items.len());
        for line in &cart.cart_items {
            if line.quantity < 1 {
                return Err(AppError::invalid_input(format!(
                    "Quantity for product {} must be at least 1",
                    line.product_id
                )));
            }
            let id = ObjectId::parse_str(&line.product_id).map_err(|_| {
                AppError::invalid_input(format!("Invalid product id: {}", line.product_id))
            })?;
            product_ids.push(id);
        }

        let buyer = self
            .store
            .find_user(&buyer_id)
            .await?
            .ok_or_else(|| AppError::not_found("Buyer"))?;
        if buyer.blocked {
            return Err(AppError::forbidden("Account is blocked"));
        }

        let products: HashMap<ObjectId, Product> = self
            .store
            .find_products(&product_ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let mut seller_id: Option<ObjectId> = None;
        let mut items = Vec::with_capacity(cart.cart_items.len());

        for (line, product_id) in cart.cart_items.iter().zip(&product_ids) {
            let product = products
                .get(product_id)
                .ok_or_else(|| AppError::not_found(format!("Product {}", product_id)))?;

            if !product.verified {
                return Err(AppError::invalid_input(format!(
                    "Product '{}' is not available for sale yet",
                    product.name
                )));
            }

            let seller = *seller_id.get_or_insert(product.owner_id);
            if product.owner_id != seller {
                return Err(AppError::invalid_input(
                    "All cart items must come from the same seller",
                ));
            }

            if let Some(client_price) = line.price {
                if (client_price - product.price).abs() > PRICE_TOLERANCE {
                    warn!(
                        "Cart price {} for product {} differs from listed price {}, using listed price",
                        client_price,
                        product_id.to_hex(),
                        product.price
                    );
                }
            }

            items.push(OrderItem {
                product_id: product.id,
                name: product.name.clone(),
                quantity: line.quantity,
                unit_price: product.price,
            });
        }

        let seller_id = seller_id.ok_or_else(|| AppError::invalid_input("Cart is empty"))?;
        if seller_id == buyer.id {
            return Err(AppError::invalid_input("You cannot order your own products"));
        }

        let mut order = Order::new(buyer.id, seller_id, items);
        let receipt = generate_receipt(Utc::now());
        order.mark_paid(&receipt)?;
        let transaction = Transaction::new(order.id, order.total_amount, receipt);

        self.store.commit_checkout(&order, &transaction).await?;

        info!(
            "🛒 Order {} placed by {} with seller {} for KES {:.2} (receipt {})",
            order.id.to_hex(),
            buyer.id.to_hex(),
            seller_id.to_hex(),
            order.total_amount,
            transaction.mpesa_receipt
        );

        self.notify_checkout(&buyer, &order).await;

        Ok(PlacedOrder { order, transaction })
    }

    async fn notify_checkout(&self, buyer: &User, order: &Order) {
        let order_ref = order.id.to_hex();

        self.notifier
            .notify(
                &buyer.phone,
                &format!(
                    "Umoja Farms: your order {} of KES {:.2} has been placed. Receipt {}.",
                    order_ref,
                    order.total_amount,
                    order.transaction_id.as_deref().unwrap_or("-")
                ),
            )
            .await;

        match self.store.find_user(&order.seller_id).await {
            Ok(Some(seller)) => {
                self.notifier
                    .notify(
                        &seller.phone,
                        &format!(
                            "Umoja Farms: new order {} from {} worth KES {:.2}.",
                            order_ref, buyer.name, order.total_amount
                        ),
                    )
                    .await;
            }
            Ok(None) => warn!("Seller {} not found, skipping new-order SMS", order.seller_id.to_hex()),
            Err(e) => warn!("Could not look up seller {}: {}", order.seller_id.to_hex(), e),
        }
    }

    /// Seller-driven transitions: success -> accepted | declined, accepted -> fulfilled.
    pub async fn update_status(&self, actor: &Claims, order_id: &str, next: &str) -> Result<Order> {
        let order_id = ObjectId::parse_str(order_id)?;
        let next: OrderStatus = next.parse()?;

        let mut order = self
            .store
            .find_order(&order_id)
            .await?
            .ok_or_else(|| AppError::not_found("Order"))?;

        if order.seller_id != actor.user_id()? {
            return Err(AppError::forbidden("Only the seller can update this order"));
        }

        if !order.status.is_seller_transition(next) {
            return Err(AppError::InvalidTransition {
                from: order.status.to_string(),
                to: next.to_string(),
            });
        }

        let previous = order.status;
        order.transition(next)?;

        if !self
            .store
            .update_order_status(&order.id, previous, next)
            .await?
        {
            // Someone else moved the order first.
            let current = self
                .store
                .find_order(&order_id)
                .await?
                .map(|o| o.status)
                .unwrap_or(previous);
            return Err(AppError::InvalidTransition {
                from: current.to_string(),
                to: next.to_string(),
            });
        }

        info!("📦 Order {} moved {} -> {}", order.id.to_hex(), previous, next);

        match self.store.find_user(&order.buyer_id).await {
            Ok(Some(buyer)) => {
                self.notifier
                    .notify(
                        &buyer.phone,
                        &format!("Umoja Farms: your order {} is now {}.", order.id.to_hex(), next),
                    )
                    .await;
            }
            Ok(None) => warn!("Buyer {} not found, skipping status SMS", order.buyer_id.to_hex()),
            Err(e) => warn!("Could not look up buyer {}: {}", order.buyer_id.to_hex(), e),
        }

        Ok(order)
    }
}
