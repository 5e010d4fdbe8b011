use chrono::{Duration, Utc};

use crate::ports::{StoreResult, TransactionLog};

/// Deletes terminal transaction log rows not touched in `days` days.
pub async fn prune_transaction_logs(log: &dyn TransactionLog, days: i64) -> StoreResult<u64> {
    let cutoff = Utc::now() - Duration::days(days.max(0));
    let removed = log.prune_before(cutoff).await?;
    tracing::info!(removed, days, "Pruned transaction logs");
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryTransactionLog;
    use crate::domain::{TransactionStatus, TransactionUpdate};
    use serde_json::json;

    #[tokio::test]
    async fn recent_rows_survive() {
        let log = MemoryTransactionLog::new();
        log.upsert_by_merchant_id(TransactionUpdate {
            order_id: 1,
            merchant_transaction_id: "M-1".into(),
            gateway_transaction_id: None,
            status: TransactionStatus::Success,
            response_payload: json!({}),
        })
        .await
        .unwrap();

        assert_eq!(prune_transaction_logs(&log, 30).await.unwrap(), 0);
        assert_eq!(log.len().await, 1);
    }
}
