//! Postgres implementation of TransactionLog.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::db::queries;
use crate::domain::{NewTransaction, Transaction, TransactionUpdate};
use crate::ports::{StoreError, StoreResult, TransactionLog};

/// Postgres-backed transaction log.
#[derive(Clone)]
pub struct PostgresTransactionLog {
    pool: PgPool,
}

impl PostgresTransactionLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[async_trait]
impl TransactionLog for PostgresTransactionLog {
    async fn insert(&self, tx: NewTransaction) -> StoreResult<Transaction> {
        let merchant_transaction_id = tx.merchant_transaction_id.clone();
        let row = queries::insert_transaction_log(&self.pool, &tx.into_transaction())
            .await
            .map_err(|err| {
                if is_unique_violation(&err) {
                    StoreError::Duplicate(merchant_transaction_id)
                } else {
                    StoreError::from(err)
                }
            })?;

        Ok(row.into_domain())
    }

    async fn upsert_by_merchant_id(&self, update: TransactionUpdate) -> StoreResult<Transaction> {
        let row = queries::upsert_transaction_log(&self.pool, &update).await?;
        Ok(row.into_domain())
    }

    async fn find_by_merchant_id(
        &self,
        merchant_transaction_id: &str,
    ) -> StoreResult<Option<Transaction>> {
        let row =
            queries::get_transaction_log_by_merchant_id(&self.pool, merchant_transaction_id)
                .await?;
        Ok(row.map(|r| r.into_domain()))
    }

    async fn find_by_gateway_id(
        &self,
        gateway_transaction_id: &str,
    ) -> StoreResult<Option<Transaction>> {
        let row =
            queries::get_transaction_log_by_gateway_id(&self.pool, gateway_transaction_id).await?;
        Ok(row.map(|r| r.into_domain()))
    }

    async fn list_for_order(&self, order_id: i64) -> StoreResult<Vec<Transaction>> {
        let rows = queries::list_transaction_logs_for_order(&self.pool, order_id).await?;
        Ok(rows.into_iter().map(|r| r.into_domain()).collect())
    }

    async fn prune_before(&self, cutoff: DateTime<Utc>) -> StoreResult<u64> {
        Ok(queries::delete_terminal_transaction_logs_before(&self.pool, cutoff).await?)
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
