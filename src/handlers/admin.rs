use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Form, Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::error::AppError;
use crate::ports::meta;
use crate::services::ADMIN_NONCE_ACTION;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct StatusCheckForm {
    pub order_id: i64,
    pub nonce: String,
}

/// GET /admin/nonce
pub async fn issue_nonce(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let nonce = state.nonces.issue(ADMIN_NONCE_ACTION)?;
    Ok(Json(json!({ "nonce": nonce })))
}

/// POST /admin/transaction-status
///
/// Returns the processor's current view of the order's transaction.
pub async fn transaction_status(
    State(state): State<AppState>,
    Form(form): Form<StatusCheckForm>,
) -> Result<impl IntoResponse, AppError> {
    state.nonces.verify(ADMIN_NONCE_ACTION, &form.nonce)?;

    let order = state
        .orders
        .find(form.order_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Order {}", form.order_id)))?;

    let merchant_id = state
        .orders
        .get_meta(order.id, meta::MERCHANT_TRANSACTION_ID)
        .await?
        .ok_or_else(|| AppError::BadRequest("No transaction ID found".to_string()))?;

    let response = state.api_client.check_status(&merchant_id).await?;

    Ok(Json(json!({
        "success": true,
        "data": response,
    })))
}

/// GET /admin/transactions/:merchant_transaction_id
pub async fn get_transaction(
    State(state): State<AppState>,
    Path(merchant_transaction_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let tx = state
        .transaction_log
        .find_by_merchant_id(&merchant_transaction_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Transaction {}", merchant_transaction_id)))?;

    Ok(Json(tx))
}

/// POST /admin/orders/:order_id/reconcile
pub async fn reconcile_order(
    State(state): State<AppState>,
    Path(order_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = state.reconciler.reconcile_order(order_id).await?;
    Ok(Json(json!({
        "order_id": outcome.order_id,
        "status": outcome.status,
    })))
}
