//! The slice of a storefront order the payment core is allowed to see.

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderStatus {
    Pending,
    Processing,
    OnHold,
    Completed,
    Cancelled,
    Failed,
    Refunded,
}

impl OrderStatus {
    pub fn slug(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::OnHold => "on-hold",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Failed => "failed",
            OrderStatus::Refunded => "refunded",
        }
    }

    /// Statuses that marking an order paid already leaves it in.
    pub fn is_paid_equivalent(&self) -> bool {
        matches!(self, OrderStatus::Processing | OrderStatus::Completed)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    /// Accepts plain slugs and the `wc-` prefixed form used by storefront settings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let slug = s.trim();
        let slug = slug.strip_prefix("wc-").unwrap_or(slug);
        match slug {
            "pending" => Ok(OrderStatus::Pending),
            "processing" => Ok(OrderStatus::Processing),
            "on-hold" => Ok(OrderStatus::OnHold),
            "completed" => Ok(OrderStatus::Completed),
            "cancelled" => Ok(OrderStatus::Cancelled),
            "failed" => Ok(OrderStatus::Failed),
            "refunded" => Ok(OrderStatus::Refunded),
            other => Err(format!("unknown order status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub order_number: String,
    pub total: BigDecimal,
    pub status: OrderStatus,
    /// Set once `payment_complete` has been recorded.
    pub transaction_id: Option<String>,
}

impl Order {
    pub fn get_id(&self) -> i64 {
        self.id
    }

    pub fn get_total(&self) -> &BigDecimal {
        &self.total
    }

    pub fn get_order_number(&self) -> &str {
        &self.order_number
    }

    pub fn is_paid(&self) -> bool {
        self.transaction_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_slugs_with_and_without_prefix() {
        assert_eq!("processing".parse::<OrderStatus>(), Ok(OrderStatus::Processing));
        assert_eq!("wc-on-hold".parse::<OrderStatus>(), Ok(OrderStatus::OnHold));
        assert_eq!(" wc-completed ".parse::<OrderStatus>(), Ok(OrderStatus::Completed));
        assert!("wc-shipped".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn paid_equivalents() {
        assert!(OrderStatus::Processing.is_paid_equivalent());
        assert!(OrderStatus::Completed.is_paid_equivalent());
        assert!(!OrderStatus::OnHold.is_paid_equivalent());
    }

    #[test]
    fn serde_uses_slugs() {
        let json = serde_json::to_string(&OrderStatus::OnHold).unwrap();
        assert_eq!(json, "\"on-hold\"");
    }
}
