use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::services::CheckoutOutcome;
use crate::AppState;

/// POST /checkout/:order_id
pub async fn process_payment(
    State(state): State<AppState>,
    Path(order_id): Path<i64>,
) -> impl IntoResponse {
    let outcome = state.checkout.process_payment(order_id).await;
    let status = match outcome {
        CheckoutOutcome::Success { .. } => StatusCode::OK,
        CheckoutOutcome::Fail { .. } => StatusCode::UNPROCESSABLE_ENTITY,
    };
    (status, Json(outcome))
}
