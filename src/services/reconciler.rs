//! Callback reconciliation.
//!
//! Callback parameters only locate the transaction. The status the order and
//! the log end up with always comes from a fresh `check_status` call.

use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;

use crate::config::StoreUrls;
use crate::domain::{Order, OrderStatus, TransactionStatus, TransactionUpdate};
use crate::gateway::{ApiResponse, PaymentApiClient};
use crate::ports::{meta, OrderStore, StoreError, TransactionLog};

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Order not found: {0}")]
    NotFound(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Identifiers carried by a processor callback, already sanitized.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackParams {
    pub gateway_transaction_id: Option<String>,
    pub merchant_transaction_id: Option<String>,
    pub order_id: Option<i64>,
    pub reference_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub order_id: i64,
    /// `None` when the processor could not be asked or gave no status.
    pub status: Option<TransactionStatus>,
    pub redirect_url: String,
}

pub struct Reconciler {
    client: Arc<PaymentApiClient>,
    orders: Arc<dyn OrderStore>,
    log: Arc<dyn TransactionLog>,
    urls: StoreUrls,
    post_payment_status: OrderStatus,
}

impl Reconciler {
    pub fn new(
        client: Arc<PaymentApiClient>,
        orders: Arc<dyn OrderStore>,
        log: Arc<dyn TransactionLog>,
        urls: StoreUrls,
        post_payment_status: OrderStatus,
    ) -> Self {
        Self {
            client,
            orders,
            log,
            urls,
            post_payment_status,
        }
    }

    pub async fn handle_callback(
        &self,
        params: CallbackParams,
    ) -> Result<Reconciliation, ReconcileError> {
        tracing::info!(
            gateway_transaction_id = ?params.gateway_transaction_id,
            merchant_transaction_id = ?params.merchant_transaction_id,
            order_id = ?params.order_id,
            reference_id = ?params.reference_id,
            "MyPay callback received"
        );

        if params.gateway_transaction_id.is_none() && params.merchant_transaction_id.is_none() {
            tracing::error!("Callback missing transaction IDs");
            return Err(ReconcileError::BadRequest(
                "missing transaction identifiers".to_string(),
            ));
        }

        let order = match self.resolve_order(&params).await? {
            Some(order) => order,
            None => {
                tracing::error!(
                    merchant_transaction_id = ?params.merchant_transaction_id,
                    gateway_transaction_id = ?params.gateway_transaction_id,
                    "Could not find order for transaction"
                );
                return Err(ReconcileError::NotFound(
                    params
                        .merchant_transaction_id
                        .clone()
                        .or_else(|| params.gateway_transaction_id.clone())
                        .unwrap_or_default(),
                ));
            }
        };

        if let Some(gateway_id) = &params.gateway_transaction_id {
            if let Err(e) = self
                .orders
                .update_meta(order.id, meta::GATEWAY_TRANSACTION_ID, gateway_id)
                .await
            {
                tracing::error!(order_id = order.id, error = %e, "Failed to save gateway transaction id");
            }
        }

        let status = self
            .refresh(
                &order,
                params.merchant_transaction_id.as_deref(),
                params.gateway_transaction_id.as_deref(),
            )
            .await;

        Ok(Reconciliation {
            order_id: order.id,
            status,
            redirect_url: self.urls.thank_you(order.id),
        })
    }

    /// Re-queries the processor for an order's stored transaction.
    pub async fn reconcile_order(&self, order_id: i64) -> Result<Reconciliation, ReconcileError> {
        let order = self
            .orders
            .find(order_id)
            .await?
            .ok_or_else(|| ReconcileError::NotFound(format!("order {}", order_id)))?;

        let merchant_id = self
            .orders
            .get_meta(order_id, meta::MERCHANT_TRANSACTION_ID)
            .await?;
        let gateway_id = self
            .orders
            .get_meta(order_id, meta::GATEWAY_TRANSACTION_ID)
            .await?;

        if merchant_id.is_none() && gateway_id.is_none() {
            return Err(ReconcileError::NotFound(format!(
                "no MyPay transaction for order {}",
                order_id
            )));
        }

        let status = self
            .refresh(&order, merchant_id.as_deref(), gateway_id.as_deref())
            .await;

        Ok(Reconciliation {
            order_id,
            status,
            redirect_url: self.urls.thank_you(order_id),
        })
    }

    async fn resolve_order(&self, params: &CallbackParams) -> Result<Option<Order>, StoreError> {
        let order_id = match params.order_id.filter(|id| *id > 0) {
            Some(id) => Some(id),
            None => self.lookup_order_id(params).await?,
        };

        match order_id {
            Some(id) => self.orders.find(id).await,
            None => Ok(None),
        }
    }

    async fn lookup_order_id(&self, params: &CallbackParams) -> Result<Option<i64>, StoreError> {
        if let Some(merchant_id) = &params.merchant_transaction_id {
            if let Some(row) = self.log.find_by_merchant_id(merchant_id).await? {
                return Ok(Some(row.order_id));
            }
        }
        if let Some(gateway_id) = &params.gateway_transaction_id {
            if let Some(row) = self.log.find_by_gateway_id(gateway_id).await? {
                return Ok(Some(row.order_id));
            }
        }
        if let Some(merchant_id) = &params.merchant_transaction_id {
            if let Some(id) = self
                .orders
                .find_by_meta(meta::MERCHANT_TRANSACTION_ID, merchant_id)
                .await?
            {
                return Ok(Some(id));
            }
        }
        if let Some(gateway_id) = &params.gateway_transaction_id {
            return self
                .orders
                .find_by_meta(meta::GATEWAY_TRANSACTION_ID, gateway_id)
                .await;
        }
        Ok(None)
    }

    /// Asks the processor for the authoritative status, records it, then
    /// moves the order. Never fails: problems are logged and leave the order
    /// as it was.
    async fn refresh(
        &self,
        order: &Order,
        merchant_id: Option<&str>,
        gateway_id: Option<&str>,
    ) -> Option<TransactionStatus> {
        let result = match (merchant_id, gateway_id) {
            (Some(merchant_id), _) => self.client.check_status(merchant_id).await,
            (None, Some(gateway_id)) => self.client.check_status_by_gateway_id(gateway_id).await,
            (None, None) => return None,
        };

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(order_id = order.id, error = %e, "Failed to check transaction status");
                return None;
            }
        };

        let Some(code) = response.status_code() else {
            tracing::warn!(order_id = order.id, "Status response carried no Status field");
            return None;
        };

        tracing::info!(
            order_id = order.id,
            status_code = code,
            response = %response.to_value(),
            "Transaction status received"
        );

        let reported = TransactionStatus::from_code(code);
        let status = self
            .record(order.id, code, reported, merchant_id, gateway_id, &response)
            .await;

        let proof = merchant_id
            .map(str::to_string)
            .or_else(|| response.merchant_transaction_id().map(str::to_string))
            .or_else(|| gateway_id.map(str::to_string))
            .unwrap_or_default();

        self.apply(order.id, status, code, response.remarks(), &proof)
            .await;

        Some(status)
    }

    /// Writes order meta and the log row ahead of any order transition.
    /// Returns the status the log row holds afterwards.
    async fn record(
        &self,
        order_id: i64,
        code: i64,
        reported: TransactionStatus,
        merchant_id: Option<&str>,
        gateway_id: Option<&str>,
        response: &ApiResponse,
    ) -> TransactionStatus {
        for (key, value) in [
            (meta::PAYMENT_STATUS, code.to_string()),
            (meta::PAYMENT_DATE, Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()),
        ] {
            if let Err(e) = self.orders.update_meta(order_id, key, &value).await {
                tracing::error!(order_id, key, error = %e, "Failed to save order meta");
            }
        }

        let merchant_id = match merchant_id
            .or_else(|| response.merchant_transaction_id())
            .map(str::to_string)
        {
            Some(id) => Some(id),
            None => match gateway_id {
                Some(gateway_id) => self
                    .log
                    .find_by_gateway_id(gateway_id)
                    .await
                    .ok()
                    .flatten()
                    .map(|row| row.merchant_transaction_id),
                None => None,
            },
        };

        let Some(merchant_id) = merchant_id else {
            tracing::warn!(order_id, "No merchant transaction id, transaction log not updated");
            return reported;
        };

        let update = TransactionUpdate {
            order_id,
            merchant_transaction_id: merchant_id,
            gateway_transaction_id: gateway_id
                .or_else(|| response.gateway_transaction_id())
                .map(str::to_string),
            status: reported,
            response_payload: response.to_value(),
        };

        match self.log.upsert_by_merchant_id(update).await {
            Ok(row) => {
                if row.status != reported {
                    tracing::info!(
                        order_id,
                        merchant_transaction_id = %row.merchant_transaction_id,
                        stored = %row.status,
                        reported = %reported,
                        "Keeping terminal transaction status"
                    );
                }
                row.status
            }
            Err(e) => {
                tracing::error!(order_id, error = %e, "Failed to update transaction log");
                reported
            }
        }
    }

    async fn apply(
        &self,
        order_id: i64,
        status: TransactionStatus,
        code: i64,
        remarks: &str,
        transaction_id: &str,
    ) {
        let already_paid = match self.orders.find(order_id).await {
            Ok(Some(order)) => order.is_paid(),
            Ok(None) => false,
            Err(e) => {
                tracing::error!(order_id, error = %e, "Failed to reload order");
                false
            }
        };

        if already_paid {
            if status != TransactionStatus::Success {
                tracing::warn!(order_id, status = %status, "Order already paid, status change ignored");
            } else {
                tracing::info!(order_id, "Order already paid");
            }
            return;
        }

        let (order_status, note) = match status {
            TransactionStatus::Success => {
                if let Err(e) = self.complete_payment(order_id, transaction_id).await {
                    tracing::error!(order_id, status = %status, error = %e, "Failed to update order");
                }
                return;
            }
            TransactionStatus::Failed => {
                tracing::error!(order_id, remarks, "Payment failed");
                (OrderStatus::Failed, format!("MyPay payment failed: {}", remarks))
            }
            TransactionStatus::Cancelled => {
                tracing::info!(order_id, remarks, "Payment cancelled");
                (
                    OrderStatus::Cancelled,
                    format!("MyPay payment cancelled: {}", remarks),
                )
            }
            TransactionStatus::Pending => {
                tracing::info!(order_id, remarks, "Payment pending");
                (OrderStatus::OnHold, format!("MyPay payment pending: {}", remarks))
            }
            TransactionStatus::Incomplete => {
                tracing::info!(order_id, remarks, "Payment incomplete");
                (
                    OrderStatus::Pending,
                    format!("MyPay payment incomplete: {}", remarks),
                )
            }
            TransactionStatus::Unknown => {
                tracing::warn!(order_id, status_code = code, "Unknown payment status");
                (
                    OrderStatus::OnHold,
                    format!("MyPay payment status unknown ({}): {}", code, remarks),
                )
            }
        };

        // A payment completed since the check above wins over this transition.
        match self
            .orders
            .update_status_if_unpaid(order_id, order_status, &note)
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(order_id, status = %status, "Order paid concurrently, status change ignored");
            }
            Err(e) => {
                tracing::error!(order_id, status = %status, error = %e, "Failed to update order");
            }
        }
    }

    async fn complete_payment(&self, order_id: i64, transaction_id: &str) -> Result<(), StoreError> {
        self.orders.payment_complete(order_id, transaction_id).await?;
        self.orders
            .add_note(
                order_id,
                &format!("MyPay payment successful. Transaction ID: {}", transaction_id),
            )
            .await?;

        if !self.post_payment_status.is_paid_equivalent() {
            self.orders
                .update_status(order_id, self.post_payment_status, "")
                .await?;
        }

        tracing::info!(order_id, "Payment completed");
        Ok(())
    }
}
