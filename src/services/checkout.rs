use serde::Serialize;
use std::sync::Arc;

use crate::domain::{NewTransaction, OrderStatus, TransactionStatus};
use crate::gateway::{ApiClientError, Endpoint, PaymentApiClient};
use crate::ports::{meta, OrderStore, TransactionLog};
use crate::utils::sanitize::sanitize_json;

pub const GENERIC_ERROR_NOTICE: &str = "Unknown error occurred while processing payment";
pub const ALREADY_PAID_NOTICE: &str = "This order has already been paid";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "lowercase")]
pub enum CheckoutOutcome {
    Success { redirect: String },
    Fail { redirect: String, notice: String },
}

impl CheckoutOutcome {
    fn fail(notice: impl Into<String>) -> Self {
        CheckoutOutcome::Fail {
            redirect: String::new(),
            notice: notice.into(),
        }
    }
}

/// Starts a MyPay payment for an order and hands back the redirect.
pub struct CheckoutService {
    client: Arc<PaymentApiClient>,
    orders: Arc<dyn OrderStore>,
    log: Arc<dyn TransactionLog>,
}

impl CheckoutService {
    pub fn new(
        client: Arc<PaymentApiClient>,
        orders: Arc<dyn OrderStore>,
        log: Arc<dyn TransactionLog>,
    ) -> Self {
        Self {
            client,
            orders,
            log,
        }
    }

    pub async fn process_payment(&self, order_id: i64) -> CheckoutOutcome {
        let order = match self.orders.find(order_id).await {
            Ok(Some(order)) => order,
            Ok(None) => {
                tracing::error!(order_id, "Checkout for unknown order");
                return CheckoutOutcome::fail(GENERIC_ERROR_NOTICE);
            }
            Err(e) => {
                tracing::error!(order_id, error = %e, "Failed to load order");
                return CheckoutOutcome::fail(GENERIC_ERROR_NOTICE);
            }
        };

        if order.is_paid() {
            tracing::warn!(order_id, "Checkout for an order that is already paid");
            return CheckoutOutcome::fail(ALREADY_PAID_NOTICE);
        }

        let request = self.client.generate_order_request(&order);
        let response = match self.client.send(Endpoint::GenerateOrder, &request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(order_id, error = %e, "Payment initiation failed");
                return CheckoutOutcome::fail(notice_for(&e));
            }
        };

        let (merchant_id, redirect) = match (
            response.succeeded(),
            response.merchant_transaction_id(),
            response.redirect_url(),
        ) {
            (true, Some(merchant_id), Some(redirect)) => {
                (merchant_id.to_string(), redirect.to_string())
            }
            _ => {
                tracing::error!(order_id, message = ?response.message(), "Payment initiation declined");
                return CheckoutOutcome::fail(match response.message() {
                    Some(message) => format!("Payment error: {}", message),
                    None => GENERIC_ERROR_NOTICE.to_string(),
                });
            }
        };

        if let Err(e) = self
            .orders
            .update_meta(order_id, meta::MERCHANT_TRANSACTION_ID, &merchant_id)
            .await
        {
            tracing::error!(order_id, error = %e, "Failed to save merchant transaction id");
            return CheckoutOutcome::fail(GENERIC_ERROR_NOTICE);
        }

        let entry = NewTransaction {
            order_id,
            merchant_transaction_id: merchant_id.clone(),
            amount: order.total.clone(),
            status: TransactionStatus::Incomplete,
            request_payload: sanitize_json(&serde_json::Value::Object(request)),
            response_payload: response.to_value(),
        };
        if let Err(e) = self.log.insert(entry).await {
            tracing::error!(order_id, merchant_transaction_id = %merchant_id, error = %e, "Failed to log transaction");
        }

        if let Err(e) = self
            .orders
            .update_status(order_id, OrderStatus::Pending, "Awaiting MyPay payment")
            .await
        {
            tracing::error!(order_id, error = %e, "Failed to mark order pending");
        }

        tracing::info!(order_id, merchant_transaction_id = %merchant_id, "Payment initiated");
        CheckoutOutcome::Success { redirect }
    }
}

fn notice_for(error: &ApiClientError) -> String {
    match error.processor_message() {
        Some(message) => format!("Payment error: {}", message),
        None => GENERIC_ERROR_NOTICE.to_string(),
    }
}
