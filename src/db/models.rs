use chrono::{DateTime, Utc};
use sqlx::types::BigDecimal;
use sqlx::FromRow;
use uuid::Uuid;

use crate::domain::{Order, OrderStatus, Transaction, TransactionStatus};

#[derive(Debug, FromRow)]
pub struct TransactionLogRow {
    pub id: Uuid,
    pub order_id: i64,
    pub merchant_transaction_id: String,
    pub gateway_transaction_id: Option<String>,
    pub amount: BigDecimal,
    pub status: String,
    pub request_data: Option<serde_json::Value>,
    pub response_data: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TransactionLogRow {
    pub fn into_domain(self) -> Transaction {
        let status = self.status.parse::<TransactionStatus>().unwrap_or_else(|err| {
            tracing::warn!(
                merchant_transaction_id = %self.merchant_transaction_id,
                "{}",
                err
            );
            TransactionStatus::Unknown
        });

        Transaction {
            id: self.id,
            order_id: self.order_id,
            merchant_transaction_id: self.merchant_transaction_id,
            gateway_transaction_id: self.gateway_transaction_id,
            amount: self.amount,
            status,
            request_payload: self.request_data,
            response_payload: self.response_data,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub struct OrderRow {
    pub id: i64,
    pub order_number: String,
    pub total: BigDecimal,
    pub status: String,
    pub transaction_id: Option<String>,
}

impl OrderRow {
    pub fn into_domain(self) -> Order {
        let status = self.status.parse::<OrderStatus>().unwrap_or_else(|err| {
            tracing::warn!(order_id = self.id, "{}", err);
            OrderStatus::OnHold
        });

        Order {
            id: self.id,
            order_number: self.order_number,
            total: self.total,
            status,
            transaction_id: self.transaction_id,
        }
    }
}
