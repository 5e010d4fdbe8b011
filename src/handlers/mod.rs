pub mod admin;
pub mod checkout;
pub mod webhook;

use crate::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub transaction_log: String,
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let transaction_log = match state.transaction_log.ping().await {
        Ok(()) => "connected",
        Err(e) => {
            tracing::error!(error = %e, "Transaction log health check failed");
            "disconnected"
        }
    };

    let healthy = transaction_log == "connected";
    let health_response = HealthStatus {
        status: if healthy { "healthy" } else { "unhealthy" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        transaction_log: transaction_log.to_string(),
    };

    let status_code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(health_response))
}
