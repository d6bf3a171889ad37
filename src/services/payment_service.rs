use std::sync::Arc;

use tracing::{info, warn};

use crate::database::store::MarketStore;
use crate::errors::{AppError, Result};
use crate::models::payment::{CallbackOutcome, StkCallback};
use crate::models::transaction::{Transaction, TransactionStatus};
use crate::models::user::Claims;
use crate::services::sms_service::Notifier;

/// Simulated M-Pesa settlement. Checkout already records a successful
/// transaction; a callback can only confirm it or report that it failed.
#[derive(Clone)]
pub struct PaymentService {
    store: Arc<dyn MarketStore>,
    notifier: Notifier,
}

impl PaymentService {
    pub fn new(store: Arc<dyn MarketStore>, notifier: Notifier) -> Self {
        PaymentService { store, notifier }
    }

    pub async fn handle_callback(&self, callback: &StkCallback) -> Result<CallbackOutcome> {
        let receipt = callback.checkout_request_id.trim();

        let Some(transaction) = self.store.find_transaction_by_receipt(receipt).await? else {
            warn!("M-Pesa callback for unknown receipt {}", receipt);
            return Ok(CallbackOutcome::UnknownReceipt);
        };

        if callback.result_code == 0 {
            if let Some(paid) = callback.paid_amount() {
                if (paid - transaction.amount).abs() > 0.005 {
                    warn!(
                        "Receipt {} confirmed for {} but transaction amount is {}",
                        receipt, paid, transaction.amount
                    );
                }
            }
            info!("💰 Payment {} confirmed", receipt);
            return Ok(CallbackOutcome::Confirmed);
        }

        if transaction.status == TransactionStatus::Failed {
            return Ok(CallbackOutcome::AlreadySettled);
        }

        if !self.store.fail_checkout(&transaction.order_id).await? {
            warn!(
                "Payment {} failed but order {} is past the point of reversal",
                receipt,
                transaction.order_id.to_hex()
            );
            return Ok(CallbackOutcome::AlreadySettled);
        }

        info!(
            "❌ Payment {} failed ({}: {}), order {} reverted",
            receipt,
            callback.result_code,
            callback.result_desc,
            transaction.order_id.to_hex()
        );

        if let Some(order) = self.store.find_order(&transaction.order_id).await? {
            if let Some(buyer) = self.store.find_user(&order.buyer_id).await? {
                self.notifier
                    .notify(
                        &buyer.phone,
                        &format!(
                            "Umoja Farms: payment for order {} failed ({}). The order was cancelled.",
                            order.id.to_hex(),
                            callback.result_desc
                        ),
                    )
                    .await;
            }
        }

        Ok(CallbackOutcome::Failed)
    }

    /// Receipt lookup for the buyer, the seller, or an admin.
    pub async fn transaction_for(&self, actor: &Claims, receipt: &str) -> Result<Transaction> {
        let transaction = self
            .store
            .find_transaction_by_receipt(receipt)
            .await?
            .ok_or_else(|| AppError::not_found("Transaction"))?;

        if actor.is_admin() {
            return Ok(transaction);
        }

        let order = self
            .store
            .find_order(&transaction.order_id)
            .await?
            .ok_or_else(|| AppError::not_found("Order"))?;
        let actor_id = actor.user_id()?;
        if order.buyer_id != actor_id && order.seller_id != actor_id {
            return Err(AppError::forbidden("This transaction belongs to another user"));
        }
        Ok(transaction)
    }
}
