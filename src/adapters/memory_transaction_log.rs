//! In-process TransactionLog. One write lock covers each find-or-create, which
//! makes upserts atomic within a process.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::domain::{NewTransaction, Transaction, TransactionUpdate};
use crate::ports::{StoreError, StoreResult, TransactionLog};

#[derive(Default)]
pub struct MemoryTransactionLog {
    rows: RwLock<HashMap<String, Transaction>>,
}

impl MemoryTransactionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

#[async_trait]
impl TransactionLog for MemoryTransactionLog {
    async fn insert(&self, tx: NewTransaction) -> StoreResult<Transaction> {
        let mut rows = self.rows.write().await;
        if rows.contains_key(&tx.merchant_transaction_id) {
            return Err(StoreError::Duplicate(tx.merchant_transaction_id));
        }
        let row = tx.into_transaction();
        rows.insert(row.merchant_transaction_id.clone(), row.clone());
        Ok(row)
    }

    async fn upsert_by_merchant_id(&self, update: TransactionUpdate) -> StoreResult<Transaction> {
        let mut rows = self.rows.write().await;
        match rows.get_mut(&update.merchant_transaction_id) {
            Some(row) => {
                update.apply_to(row);
                Ok(row.clone())
            }
            None => {
                let row = update.into_transaction();
                rows.insert(row.merchant_transaction_id.clone(), row.clone());
                Ok(row)
            }
        }
    }

    async fn find_by_merchant_id(
        &self,
        merchant_transaction_id: &str,
    ) -> StoreResult<Option<Transaction>> {
        Ok(self.rows.read().await.get(merchant_transaction_id).cloned())
    }

    async fn find_by_gateway_id(
        &self,
        gateway_transaction_id: &str,
    ) -> StoreResult<Option<Transaction>> {
        Ok(self
            .rows
            .read()
            .await
            .values()
            .filter(|row| row.gateway_transaction_id.as_deref() == Some(gateway_transaction_id))
            .max_by_key(|row| row.updated_at)
            .cloned())
    }

    async fn list_for_order(&self, order_id: i64) -> StoreResult<Vec<Transaction>> {
        let mut rows: Vec<Transaction> = self
            .rows
            .read()
            .await
            .values()
            .filter(|row| row.order_id == order_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn prune_before(&self, cutoff: DateTime<Utc>) -> StoreResult<u64> {
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|_, row| !(row.status.is_terminal() && row.updated_at < cutoff));
        Ok((before - rows.len()) as u64)
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TransactionStatus;
    use bigdecimal::BigDecimal;
    use serde_json::json;
    use std::sync::Arc;

    fn new_tx(merchant_id: &str) -> NewTransaction {
        NewTransaction {
            order_id: 42,
            merchant_transaction_id: merchant_id.to_string(),
            amount: BigDecimal::from(1500),
            status: TransactionStatus::Incomplete,
            request_payload: json!({"OrderId": "000042"}),
            response_payload: json!({"status": true}),
        }
    }

    fn update(merchant_id: &str, status: TransactionStatus) -> TransactionUpdate {
        TransactionUpdate {
            order_id: 42,
            merchant_transaction_id: merchant_id.to_string(),
            gateway_transaction_id: Some("G-1".to_string()),
            status,
            response_payload: json!({"Status": 1}),
        }
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_merchant_id() {
        let log = MemoryTransactionLog::new();
        log.insert(new_tx("M-1")).await.unwrap();
        let err = log.insert(new_tx("M-1")).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
    }

    #[tokio::test]
    async fn upsert_updates_existing_row_in_place() {
        let log = MemoryTransactionLog::new();
        let inserted = log.insert(new_tx("M-1")).await.unwrap();

        let row = log
            .upsert_by_merchant_id(update("M-1", TransactionStatus::Success))
            .await
            .unwrap();

        assert_eq!(row.id, inserted.id);
        assert_eq!(row.amount, BigDecimal::from(1500));
        assert_eq!(row.status, TransactionStatus::Success);
        assert_eq!(row.gateway_transaction_id.as_deref(), Some("G-1"));
        assert_eq!(log.len().await, 1);
    }

    #[tokio::test]
    async fn upsert_creates_row_with_zero_amount() {
        let log = MemoryTransactionLog::new();
        let row = log
            .upsert_by_merchant_id(update("M-2", TransactionStatus::Pending))
            .await
            .unwrap();
        assert_eq!(row.amount, BigDecimal::from(0));
        assert!(row.request_payload.is_none());
    }

    #[tokio::test]
    async fn concurrent_upserts_leave_one_row() {
        let log = Arc::new(MemoryTransactionLog::new());
        let mut handles = Vec::new();
        for i in 0..20 {
            let log = log.clone();
            let status = if i % 2 == 0 {
                TransactionStatus::Pending
            } else {
                TransactionStatus::Success
            };
            handles.push(tokio::spawn(async move {
                log.upsert_by_merchant_id(update("M-3", status)).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(log.len().await, 1);
        let row = log.find_by_merchant_id("M-3").await.unwrap().unwrap();
        assert_eq!(row.status, TransactionStatus::Success);
    }

    #[tokio::test]
    async fn finds_by_gateway_id() {
        let log = MemoryTransactionLog::new();
        log.upsert_by_merchant_id(update("M-4", TransactionStatus::Pending))
            .await
            .unwrap();
        let row = log.find_by_gateway_id("G-1").await.unwrap().unwrap();
        assert_eq!(row.merchant_transaction_id, "M-4");
        assert!(log.find_by_gateway_id("G-404").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn prune_only_removes_old_terminal_rows() {
        let log = MemoryTransactionLog::new();
        log.upsert_by_merchant_id(update("M-old", TransactionStatus::Success))
            .await
            .unwrap();
        log.upsert_by_merchant_id(update("M-open", TransactionStatus::Pending))
            .await
            .unwrap();

        let removed = log
            .prune_before(Utc::now() + chrono::Duration::seconds(1))
            .await
            .unwrap();

        assert_eq!(removed, 1);
        assert!(log.find_by_merchant_id("M-open").await.unwrap().is_some());
    }
}
