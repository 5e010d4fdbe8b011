//! OrderStore over the storefront's `orders`, `order_meta` and `order_notes`
//! tables.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::db::queries;
use crate::domain::{Order, OrderStatus};
use crate::ports::{OrderStore, StoreError, StoreResult};

#[derive(Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
}

impl PostgresOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn ensure_exists(&self, order_id: i64) -> StoreResult<()> {
        match queries::get_order(&self.pool, order_id).await? {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(format!("order {}", order_id))),
        }
    }
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    async fn find(&self, order_id: i64) -> StoreResult<Option<Order>> {
        let row = queries::get_order(&self.pool, order_id).await?;
        Ok(row.map(|r| r.into_domain()))
    }

    async fn find_by_meta(&self, key: &str, value: &str) -> StoreResult<Option<i64>> {
        Ok(queries::find_order_id_by_meta(&self.pool, key, value).await?)
    }

    async fn get_meta(&self, order_id: i64, key: &str) -> StoreResult<Option<String>> {
        Ok(queries::get_order_meta(&self.pool, order_id, key).await?)
    }

    async fn update_meta(&self, order_id: i64, key: &str, value: &str) -> StoreResult<()> {
        self.ensure_exists(order_id).await?;
        queries::upsert_order_meta(&self.pool, order_id, key, value).await?;
        Ok(())
    }

    async fn update_status(
        &self,
        order_id: i64,
        status: OrderStatus,
        note: &str,
    ) -> StoreResult<()> {
        if queries::update_order_status(&self.pool, order_id, status.slug(), note).await? {
            Ok(())
        } else {
            Err(StoreError::NotFound(format!("order {}", order_id)))
        }
    }

    async fn update_status_if_unpaid(
        &self,
        order_id: i64,
        status: OrderStatus,
        note: &str,
    ) -> StoreResult<bool> {
        if queries::update_unpaid_order_status(&self.pool, order_id, status.slug(), note).await? {
            return Ok(true);
        }
        self.ensure_exists(order_id).await?;
        Ok(false)
    }

    async fn payment_complete(&self, order_id: i64, transaction_id: &str) -> StoreResult<()> {
        if !queries::complete_order_payment(&self.pool, order_id, transaction_id).await? {
            // Already paid is fine; only a missing order is an error.
            self.ensure_exists(order_id).await?;
            tracing::debug!(order_id, "Order already paid, payment_complete ignored");
        }
        Ok(())
    }

    async fn add_note(&self, order_id: i64, note: &str) -> StoreResult<()> {
        self.ensure_exists(order_id).await?;
        queries::insert_order_note(&self.pool, order_id, note).await?;
        Ok(())
    }
}
