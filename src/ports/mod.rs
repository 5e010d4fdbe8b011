//! Capabilities the payment core consumes. The storefront owns orders; the core
//! only reads them and mutates them through `OrderStore`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::{NewTransaction, Order, OrderStatus, Transaction, TransactionUpdate};

/// Order metadata keys written by the gateway.
pub mod meta {
    pub const MERCHANT_TRANSACTION_ID: &str = "_mypay_merchant_transaction_id";
    pub const GATEWAY_TRANSACTION_ID: &str = "_mypay_gateway_transaction_id";
    pub const PAYMENT_STATUS: &str = "_mypay_payment_status";
    pub const PAYMENT_DATE: &str = "_mypay_payment_date";
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate entry: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Store backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn find(&self, order_id: i64) -> StoreResult<Option<Order>>;

    /// Looks an order up through its metadata index.
    async fn find_by_meta(&self, key: &str, value: &str) -> StoreResult<Option<i64>>;

    async fn get_meta(&self, order_id: i64, key: &str) -> StoreResult<Option<String>>;

    /// Overwrites one metadata value and persists it.
    async fn update_meta(&self, order_id: i64, key: &str, value: &str) -> StoreResult<()>;

    async fn update_status(&self, order_id: i64, status: OrderStatus, note: &str)
        -> StoreResult<()>;

    /// Like `update_status`, but only while the order is unpaid, checked and
    /// written atomically. Returns false when the order is already paid.
    async fn update_status_if_unpaid(
        &self,
        order_id: i64,
        status: OrderStatus,
        note: &str,
    ) -> StoreResult<bool>;

    /// Marks the order paid. A second call for a paid order changes nothing.
    async fn payment_complete(&self, order_id: i64, transaction_id: &str) -> StoreResult<()>;

    async fn add_note(&self, order_id: i64, note: &str) -> StoreResult<()>;
}

#[async_trait]
pub trait TransactionLog: Send + Sync {
    /// Fails with `StoreError::Duplicate` when the merchant transaction id exists.
    async fn insert(&self, tx: NewTransaction) -> StoreResult<Transaction>;

    /// Atomic find-or-create keyed by merchant transaction id.
    async fn upsert_by_merchant_id(&self, update: TransactionUpdate) -> StoreResult<Transaction>;

    async fn find_by_merchant_id(&self, merchant_transaction_id: &str)
        -> StoreResult<Option<Transaction>>;

    async fn find_by_gateway_id(&self, gateway_transaction_id: &str)
        -> StoreResult<Option<Transaction>>;

    async fn list_for_order(&self, order_id: i64) -> StoreResult<Vec<Transaction>>;

    /// Deletes terminal rows last touched before `cutoff`.
    async fn prune_before(&self, cutoff: DateTime<Utc>) -> StoreResult<u64>;

    async fn ping(&self) -> StoreResult<()>;
}
