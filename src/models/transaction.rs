// models/transaction.rs
use chrono::{DateTime, Utc};
use mongodb::bson;
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Success,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionStatus::Success => "success",
            TransactionStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub order_id: ObjectId,
    pub amount: f64,
    pub status: TransactionStatus,
    pub mpesa_receipt: String,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn new(order_id: ObjectId, amount: f64, mpesa_receipt: String) -> Self {
        Transaction {
            id: ObjectId::new(),
            order_id,
            amount,
            status: TransactionStatus::Success,
            mpesa_receipt,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub order_id: String,
    pub amount: f64,
    pub status: TransactionStatus,
    pub mpesa_receipt: String,
    pub created_at: DateTime<Utc>,
}

impl From<Transaction> for TransactionResponse {
    fn from(tx: Transaction) -> Self {
        TransactionResponse {
            id: tx.id.to_hex(),
            order_id: tx.order_id.to_hex(),
            amount: tx.amount,
            status: tx.status,
            mpesa_receipt: tx.mpesa_receipt,
            created_at: tx.created_at,
        }
    }
}
