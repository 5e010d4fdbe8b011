//! Transaction log domain entity.
//! Framework-agnostic representation of one MyPay payment attempt.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Lifecycle status of a transaction as reported by the processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Incomplete,
    Success,
    Failed,
    Cancelled,
    Pending,
    Unknown,
}

impl TransactionStatus {
    pub const TERMINAL: [TransactionStatus; 3] = [
        TransactionStatus::Success,
        TransactionStatus::Failed,
        TransactionStatus::Cancelled,
    ];

    /// Maps the processor's integer status code.
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => TransactionStatus::Success,
            2 => TransactionStatus::Failed,
            3 => TransactionStatus::Cancelled,
            4 => TransactionStatus::Pending,
            5 => TransactionStatus::Incomplete,
            _ => TransactionStatus::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Incomplete => "incomplete",
            TransactionStatus::Success => "success",
            TransactionStatus::Failed => "failed",
            TransactionStatus::Cancelled => "cancelled",
            TransactionStatus::Pending => "pending",
            TransactionStatus::Unknown => "unknown",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TransactionStatus::Incomplete => "Incomplete",
            TransactionStatus::Success => "Success",
            TransactionStatus::Failed => "Failed",
            TransactionStatus::Cancelled => "Cancelled",
            TransactionStatus::Pending => "Pending",
            TransactionStatus::Unknown => "Unknown",
        }
    }

    pub fn is_terminal(&self) -> bool {
        Self::TERMINAL.contains(self)
    }

    /// Status a stored row should hold after an update reports `next`.
    /// Terminal rows never fall back to a non-terminal status.
    pub fn merge(self, next: TransactionStatus) -> TransactionStatus {
        if self.is_terminal() && !next.is_terminal() {
            self
        } else {
            next
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "incomplete" => Ok(TransactionStatus::Incomplete),
            "success" => Ok(TransactionStatus::Success),
            "failed" => Ok(TransactionStatus::Failed),
            "cancelled" => Ok(TransactionStatus::Cancelled),
            "pending" => Ok(TransactionStatus::Pending),
            "unknown" => Ok(TransactionStatus::Unknown),
            other => Err(format!("unknown transaction status: {}", other)),
        }
    }
}

/// One row of the transaction log, keyed by merchant transaction id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub order_id: i64,
    pub merchant_transaction_id: String,
    pub gateway_transaction_id: Option<String>,
    pub amount: BigDecimal,
    pub status: TransactionStatus,
    pub request_payload: Option<serde_json::Value>,
    pub response_payload: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row recorded when checkout creates the remote order.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub order_id: i64,
    pub merchant_transaction_id: String,
    pub amount: BigDecimal,
    pub status: TransactionStatus,
    pub request_payload: serde_json::Value,
    pub response_payload: serde_json::Value,
}

impl NewTransaction {
    pub fn into_transaction(self) -> Transaction {
        let now = Utc::now();
        Transaction {
            id: Uuid::new_v4(),
            order_id: self.order_id,
            merchant_transaction_id: self.merchant_transaction_id,
            gateway_transaction_id: None,
            amount: self.amount,
            status: self.status,
            request_payload: Some(self.request_payload),
            response_payload: Some(self.response_payload),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Fields written by a status callback. The amount is not known on this path.
#[derive(Debug, Clone)]
pub struct TransactionUpdate {
    pub order_id: i64,
    pub merchant_transaction_id: String,
    pub gateway_transaction_id: Option<String>,
    pub status: TransactionStatus,
    pub response_payload: serde_json::Value,
}

impl TransactionUpdate {
    pub fn into_transaction(self) -> Transaction {
        let now = Utc::now();
        Transaction {
            id: Uuid::new_v4(),
            order_id: self.order_id,
            merchant_transaction_id: self.merchant_transaction_id,
            gateway_transaction_id: self.gateway_transaction_id,
            amount: BigDecimal::from(0),
            status: self.status,
            request_payload: None,
            response_payload: Some(self.response_payload),
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies this update to an existing row in place.
    pub fn apply_to(self, row: &mut Transaction) {
        if self.gateway_transaction_id.is_some() {
            row.gateway_transaction_id = self.gateway_transaction_id;
        }
        let merged = row.status.merge(self.status);
        if merged == self.status {
            row.response_payload = Some(self.response_payload);
        }
        row.status = merged;
        row.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn maps_processor_codes() {
        assert_eq!(TransactionStatus::from_code(1), TransactionStatus::Success);
        assert_eq!(TransactionStatus::from_code(2), TransactionStatus::Failed);
        assert_eq!(TransactionStatus::from_code(3), TransactionStatus::Cancelled);
        assert_eq!(TransactionStatus::from_code(4), TransactionStatus::Pending);
        assert_eq!(TransactionStatus::from_code(5), TransactionStatus::Incomplete);
        assert_eq!(TransactionStatus::from_code(0), TransactionStatus::Unknown);
        assert_eq!(TransactionStatus::from_code(99), TransactionStatus::Unknown);
    }

    #[test]
    fn status_string_roundtrip_for_storage() {
        for status in [
            TransactionStatus::Incomplete,
            TransactionStatus::Success,
            TransactionStatus::Failed,
            TransactionStatus::Cancelled,
            TransactionStatus::Pending,
            TransactionStatus::Unknown,
        ] {
            assert_eq!(status.as_str().parse::<TransactionStatus>(), Ok(status));
        }
        assert!("paid".parse::<TransactionStatus>().is_err());
    }

    #[test]
    fn terminal_status_is_sticky() {
        let success = TransactionStatus::Success;
        assert_eq!(success.merge(TransactionStatus::Pending), TransactionStatus::Success);
        assert_eq!(success.merge(TransactionStatus::Unknown), TransactionStatus::Success);
        assert_eq!(success.merge(TransactionStatus::Success), TransactionStatus::Success);
        assert_eq!(
            TransactionStatus::Pending.merge(TransactionStatus::Success),
            TransactionStatus::Success
        );
        assert_eq!(
            TransactionStatus::Unknown.merge(TransactionStatus::Pending),
            TransactionStatus::Pending
        );
    }

    #[test]
    fn update_keeps_gateway_id_when_absent() {
        let mut row = TransactionUpdate {
            order_id: 7,
            merchant_transaction_id: "M-1".into(),
            gateway_transaction_id: Some("G-1".into()),
            status: TransactionStatus::Pending,
            response_payload: json!({"Status": 4}),
        }
        .into_transaction();

        TransactionUpdate {
            order_id: 7,
            merchant_transaction_id: "M-1".into(),
            gateway_transaction_id: None,
            status: TransactionStatus::Success,
            response_payload: json!({"Status": 1}),
        }
        .apply_to(&mut row);

        assert_eq!(row.gateway_transaction_id.as_deref(), Some("G-1"));
        assert_eq!(row.status, TransactionStatus::Success);
        assert_eq!(row.response_payload, Some(json!({"Status": 1})));
    }

    #[test]
    fn late_pending_does_not_overwrite_success() {
        let mut row = TransactionUpdate {
            order_id: 7,
            merchant_transaction_id: "M-1".into(),
            gateway_transaction_id: None,
            status: TransactionStatus::Success,
            response_payload: json!({"Status": 1}),
        }
        .into_transaction();

        TransactionUpdate {
            order_id: 7,
            merchant_transaction_id: "M-1".into(),
            gateway_transaction_id: None,
            status: TransactionStatus::Pending,
            response_payload: json!({"Status": 4}),
        }
        .apply_to(&mut row);

        assert_eq!(row.status, TransactionStatus::Success);
        assert_eq!(row.response_payload, Some(json!({"Status": 1})));
    }
}
