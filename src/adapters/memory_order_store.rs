//! In-process OrderStore used by the test-suite and by embedders without a
//! storefront database.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::domain::{Order, OrderStatus};
use crate::ports::{OrderStore, StoreError, StoreResult};

#[derive(Debug, Clone)]
pub struct OrderRecord {
    pub order: Order,
    pub meta: HashMap<String, String>,
    pub notes: Vec<String>,
    /// Every transaction id `payment_complete` was called with, in order.
    pub payment_completions: Vec<String>,
}

#[derive(Default)]
pub struct MemoryOrderStore {
    orders: RwLock<HashMap<i64, OrderRecord>>,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, order: Order) {
        let record = OrderRecord {
            order,
            meta: HashMap::new(),
            notes: Vec::new(),
            payment_completions: Vec::new(),
        };
        self.orders.write().await.insert(record.order.id, record);
    }

    pub async fn record(&self, order_id: i64) -> Option<OrderRecord> {
        self.orders.read().await.get(&order_id).cloned()
    }
}

fn not_found(order_id: i64) -> StoreError {
    StoreError::NotFound(format!("order {}", order_id))
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn find(&self, order_id: i64) -> StoreResult<Option<Order>> {
        Ok(self
            .orders
            .read()
            .await
            .get(&order_id)
            .map(|record| record.order.clone()))
    }

    async fn find_by_meta(&self, key: &str, value: &str) -> StoreResult<Option<i64>> {
        Ok(self
            .orders
            .read()
            .await
            .values()
            .find(|record| record.meta.get(key).map(String::as_str) == Some(value))
            .map(|record| record.order.id))
    }

    async fn get_meta(&self, order_id: i64, key: &str) -> StoreResult<Option<String>> {
        let orders = self.orders.read().await;
        let record = orders.get(&order_id).ok_or_else(|| not_found(order_id))?;
        Ok(record.meta.get(key).cloned())
    }

    async fn update_meta(&self, order_id: i64, key: &str, value: &str) -> StoreResult<()> {
        let mut orders = self.orders.write().await;
        let record = orders.get_mut(&order_id).ok_or_else(|| not_found(order_id))?;
        record.meta.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn update_status(
        &self,
        order_id: i64,
        status: OrderStatus,
        note: &str,
    ) -> StoreResult<()> {
        let mut orders = self.orders.write().await;
        let record = orders.get_mut(&order_id).ok_or_else(|| not_found(order_id))?;
        record.order.status = status;
        if !note.is_empty() {
            record.notes.push(note.to_string());
        }
        Ok(())
    }

    async fn update_status_if_unpaid(
        &self,
        order_id: i64,
        status: OrderStatus,
        note: &str,
    ) -> StoreResult<bool> {
        let mut orders = self.orders.write().await;
        let record = orders.get_mut(&order_id).ok_or_else(|| not_found(order_id))?;
        if record.order.is_paid() {
            return Ok(false);
        }
        record.order.status = status;
        if !note.is_empty() {
            record.notes.push(note.to_string());
        }
        Ok(true)
    }

    async fn payment_complete(&self, order_id: i64, transaction_id: &str) -> StoreResult<()> {
        let mut orders = self.orders.write().await;
        let record = orders.get_mut(&order_id).ok_or_else(|| not_found(order_id))?;
        record.payment_completions.push(transaction_id.to_string());
        if record.order.transaction_id.is_none() {
            record.order.transaction_id = Some(transaction_id.to_string());
            record.order.status = OrderStatus::Processing;
        }
        Ok(())
    }

    async fn add_note(&self, order_id: i64, note: &str) -> StoreResult<()> {
        let mut orders = self.orders.write().await;
        let record = orders.get_mut(&order_id).ok_or_else(|| not_found(order_id))?;
        record.notes.push(note.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;

    fn order(id: i64) -> Order {
        Order {
            id,
            order_number: id.to_string(),
            total: BigDecimal::from(250),
            status: OrderStatus::Pending,
            transaction_id: None,
        }
    }

    #[tokio::test]
    async fn payment_complete_is_idempotent() {
        let store = MemoryOrderStore::new();
        store.insert(order(1)).await;

        store.payment_complete(1, "M-1").await.unwrap();
        store.update_status(1, OrderStatus::Completed, "").await.unwrap();
        store.payment_complete(1, "M-1").await.unwrap();

        let record = store.record(1).await.unwrap();
        assert_eq!(record.order.status, OrderStatus::Completed);
        assert_eq!(record.order.transaction_id.as_deref(), Some("M-1"));
        assert_eq!(record.payment_completions.len(), 2);
    }

    #[tokio::test]
    async fn conditional_status_update_skips_paid_orders() {
        let store = MemoryOrderStore::new();
        store.insert(order(1)).await;

        assert!(store
            .update_status_if_unpaid(1, OrderStatus::OnHold, "pending")
            .await
            .unwrap());
        store.payment_complete(1, "M-1").await.unwrap();
        assert!(!store
            .update_status_if_unpaid(1, OrderStatus::OnHold, "late")
            .await
            .unwrap());

        let record = store.record(1).await.unwrap();
        assert_eq!(record.order.status, OrderStatus::Processing);
        assert_eq!(record.notes, vec!["pending".to_string()]);
    }

    #[tokio::test]
    async fn finds_orders_through_meta() {
        let store = MemoryOrderStore::new();
        store.insert(order(1)).await;
        store.insert(order(2)).await;
        store.update_meta(2, "_key", "abc").await.unwrap();

        assert_eq!(store.find_by_meta("_key", "abc").await.unwrap(), Some(2));
        assert_eq!(store.find_by_meta("_key", "zzz").await.unwrap(), None);
    }

    #[tokio::test]
    async fn mutations_on_missing_orders_fail() {
        let store = MemoryOrderStore::new();
        let err = store.add_note(9, "hello").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }
}
