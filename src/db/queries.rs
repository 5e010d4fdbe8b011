use chrono::{DateTime, Utc};
use sqlx::{PgPool, Result};

use crate::db::models::{OrderRow, TransactionLogRow};
use crate::domain::{Transaction, TransactionUpdate};

// --- Transaction Log Queries ---

pub async fn insert_transaction_log(pool: &PgPool, tx: &Transaction) -> Result<TransactionLogRow> {
    sqlx::query_as::<_, TransactionLogRow>(
        r#"
        INSERT INTO transaction_logs (
            id, order_id, merchant_transaction_id, gateway_transaction_id, amount, status,
            request_data, response_data, created_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING *
        "#,
    )
    .bind(tx.id)
    .bind(tx.order_id)
    .bind(&tx.merchant_transaction_id)
    .bind(&tx.gateway_transaction_id)
    .bind(&tx.amount)
    .bind(tx.status.as_str())
    .bind(&tx.request_payload)
    .bind(&tx.response_payload)
    .bind(tx.created_at)
    .bind(tx.updated_at)
    .fetch_one(pool)
    .await
}

/// Single-statement find-or-create on the unique merchant transaction id.
/// A terminal status is never replaced by a non-terminal one, and a missing
/// gateway id never erases a stored one.
pub async fn upsert_transaction_log(
    pool: &PgPool,
    update: &TransactionUpdate,
) -> Result<TransactionLogRow> {
    sqlx::query_as::<_, TransactionLogRow>(
        r#"
        INSERT INTO transaction_logs (
            id, order_id, merchant_transaction_id, gateway_transaction_id, amount, status,
            request_data, response_data, created_at, updated_at
        ) VALUES ($1, $2, $3, $4, 0, $5, NULL, $6, NOW(), NOW())
        ON CONFLICT (merchant_transaction_id) DO UPDATE SET
            gateway_transaction_id = COALESCE(
                EXCLUDED.gateway_transaction_id,
                transaction_logs.gateway_transaction_id
            ),
            status = CASE
                WHEN transaction_logs.status IN ('success', 'failed', 'cancelled')
                 AND EXCLUDED.status NOT IN ('success', 'failed', 'cancelled')
                THEN transaction_logs.status
                ELSE EXCLUDED.status
            END,
            response_data = CASE
                WHEN transaction_logs.status IN ('success', 'failed', 'cancelled')
                 AND EXCLUDED.status NOT IN ('success', 'failed', 'cancelled')
                THEN transaction_logs.response_data
                ELSE EXCLUDED.response_data
            END,
            updated_at = NOW()
        RETURNING *
        "#,
    )
    .bind(uuid::Uuid::new_v4())
    .bind(update.order_id)
    .bind(&update.merchant_transaction_id)
    .bind(&update.gateway_transaction_id)
    .bind(update.status.as_str())
    .bind(&update.response_payload)
    .fetch_one(pool)
    .await
}

pub async fn get_transaction_log_by_merchant_id(
    pool: &PgPool,
    merchant_transaction_id: &str,
) -> Result<Option<TransactionLogRow>> {
    sqlx::query_as::<_, TransactionLogRow>(
        "SELECT * FROM transaction_logs WHERE merchant_transaction_id = $1",
    )
    .bind(merchant_transaction_id)
    .fetch_optional(pool)
    .await
}

pub async fn get_transaction_log_by_gateway_id(
    pool: &PgPool,
    gateway_transaction_id: &str,
) -> Result<Option<TransactionLogRow>> {
    sqlx::query_as::<_, TransactionLogRow>(
        r#"
        SELECT * FROM transaction_logs
        WHERE gateway_transaction_id = $1
        ORDER BY updated_at DESC
        LIMIT 1
        "#,
    )
    .bind(gateway_transaction_id)
    .fetch_optional(pool)
    .await
}

pub async fn list_transaction_logs_for_order(
    pool: &PgPool,
    order_id: i64,
) -> Result<Vec<TransactionLogRow>> {
    sqlx::query_as::<_, TransactionLogRow>(
        "SELECT * FROM transaction_logs WHERE order_id = $1 ORDER BY created_at DESC",
    )
    .bind(order_id)
    .fetch_all(pool)
    .await
}

pub async fn delete_terminal_transaction_logs_before(
    pool: &PgPool,
    cutoff: DateTime<Utc>,
) -> Result<u64> {
    let result = sqlx::query(
        r#"
        DELETE FROM transaction_logs
        WHERE status IN ('success', 'failed', 'cancelled')
        AND updated_at < $1
        "#,
    )
    .bind(cutoff)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

// --- Order Queries ---

pub async fn get_order(pool: &PgPool, order_id: i64) -> Result<Option<OrderRow>> {
    sqlx::query_as::<_, OrderRow>(
        "SELECT id, order_number, total, status, transaction_id FROM orders WHERE id = $1",
    )
    .bind(order_id)
    .fetch_optional(pool)
    .await
}

pub async fn find_order_id_by_meta(pool: &PgPool, key: &str, value: &str) -> Result<Option<i64>> {
    sqlx::query_scalar::<_, i64>(
        "SELECT order_id FROM order_meta WHERE meta_key = $1 AND meta_value = $2 LIMIT 1",
    )
    .bind(key)
    .bind(value)
    .fetch_optional(pool)
    .await
}

pub async fn get_order_meta(pool: &PgPool, order_id: i64, key: &str) -> Result<Option<String>> {
    sqlx::query_scalar::<_, String>(
        "SELECT meta_value FROM order_meta WHERE order_id = $1 AND meta_key = $2",
    )
    .bind(order_id)
    .bind(key)
    .fetch_optional(pool)
    .await
}

pub async fn upsert_order_meta(pool: &PgPool, order_id: i64, key: &str, value: &str) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO order_meta (order_id, meta_key, meta_value, updated_at)
        VALUES ($1, $2, $3, NOW())
        ON CONFLICT (order_id, meta_key)
        DO UPDATE SET meta_value = EXCLUDED.meta_value, updated_at = NOW()
        "#,
    )
    .bind(order_id)
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;

    Ok(())
}

/// Returns false when no such order exists.
pub async fn update_order_status(
    pool: &PgPool,
    order_id: i64,
    status: &str,
    note: &str,
) -> Result<bool> {
    set_order_status(
        pool,
        "UPDATE orders SET status = $2, updated_at = NOW() WHERE id = $1",
        order_id,
        status,
        note,
    )
    .await
}

/// Returns false when the order is already paid or does not exist.
pub async fn update_unpaid_order_status(
    pool: &PgPool,
    order_id: i64,
    status: &str,
    note: &str,
) -> Result<bool> {
    set_order_status(
        pool,
        "UPDATE orders SET status = $2, updated_at = NOW() WHERE id = $1 AND paid_at IS NULL",
        order_id,
        status,
        note,
    )
    .await
}

/// Runs a status update and its note in one transaction.
async fn set_order_status(
    pool: &PgPool,
    update: &str,
    order_id: i64,
    status: &str,
    note: &str,
) -> Result<bool> {
    let mut transaction = pool.begin().await?;

    let updated = sqlx::query(update)
        .bind(order_id)
        .bind(status)
        .execute(&mut *transaction)
        .await?
        .rows_affected();

    if updated == 0 {
        transaction.rollback().await?;
        return Ok(false);
    }

    if !note.is_empty() {
        sqlx::query("INSERT INTO order_notes (order_id, note) VALUES ($1, $2)")
            .bind(order_id)
            .bind(note)
            .execute(&mut *transaction)
            .await?;
    }

    transaction.commit().await?;
    Ok(true)
}

/// Marks an unpaid order paid. Returns false when the order was already paid
/// or does not exist.
pub async fn complete_order_payment(
    pool: &PgPool,
    order_id: i64,
    transaction_id: &str,
) -> Result<bool> {
    let updated = sqlx::query(
        r#"
        UPDATE orders
        SET status = 'processing', transaction_id = $2, paid_at = NOW(), updated_at = NOW()
        WHERE id = $1 AND paid_at IS NULL
        "#,
    )
    .bind(order_id)
    .bind(transaction_id)
    .execute(pool)
    .await?
    .rows_affected();

    Ok(updated > 0)
}

pub async fn insert_order_note(pool: &PgPool, order_id: i64, note: &str) -> Result<()> {
    sqlx::query("INSERT INTO order_notes (order_id, note) VALUES ($1, $2)")
        .bind(order_id)
        .bind(note)
        .execute(pool)
        .await?;

    Ok(())
}
