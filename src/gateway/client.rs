use bigdecimal::BigDecimal;
use serde_json::{json, Map, Value};
use std::fmt;
use std::sync::Arc;
use url::Url;

use super::error::ApiClientError;
use super::requester::{HttpRequester, RawResponse};
use super::retry::{new_idempotency_key, IdempotencyStrategy, RetryPolicy};
use super::types::{ApiRequest, ApiResponse, Endpoint, Endpoints};
use crate::domain::Order;
use crate::rate_limit::RateLimiter;
use crate::utils::sanitize::sanitize_json;
use crate::validation::SchemaValidator;

#[derive(Clone)]
pub struct Credentials {
    pub api_key: String,
    pub merchant_id: String,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"****")
            .field("merchant_id", &self.merchant_id)
            .field("username", &"****")
            .field("password", &"****")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub endpoints: Endpoints,
    pub credentials: Credentials,
    /// Buyer return URL; the order id is appended as a query parameter.
    pub callback_url: Url,
    pub retry: RetryPolicy,
    pub idempotency: IdempotencyStrategy,
}

/// Client for the MyPay payments API.
pub struct PaymentApiClient {
    settings: ClientSettings,
    validator: SchemaValidator,
    requester: Arc<dyn HttpRequester>,
    rate_limiter: Arc<dyn RateLimiter>,
}

impl PaymentApiClient {
    pub fn new(
        settings: ClientSettings,
        requester: Arc<dyn HttpRequester>,
        rate_limiter: Arc<dyn RateLimiter>,
    ) -> Self {
        Self {
            settings,
            validator: SchemaValidator::mypay(),
            requester,
            rate_limiter,
        }
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    /// Builds the `generate_order` body for an order.
    pub fn generate_order_request(&self, order: &Order) -> ApiRequest {
        let credentials = &self.settings.credentials;
        let mut return_url = self.settings.callback_url.clone();
        return_url
            .query_pairs_mut()
            .append_pair("order_id", &order.get_id().to_string());

        let mut request = Map::new();
        request.insert("Amount".into(), json!(format_amount(order.get_total())));
        request.insert(
            "OrderId".into(),
            json!(format!("{:0>6}", order.get_order_number())),
        );
        request.insert("UserName".into(), json!(credentials.username));
        request.insert("Password".into(), json!(credentials.password));
        request.insert("MerchantId".into(), json!(credentials.merchant_id));
        request.insert("ReturnUrl".into(), json!(return_url.as_str()));
        request
    }

    pub async fn generate_order(&self, order: &Order) -> Result<ApiResponse, ApiClientError> {
        let request = self.generate_order_request(order);
        self.send(Endpoint::GenerateOrder, &request).await
    }

    pub async fn check_status(
        &self,
        merchant_transaction_id: &str,
    ) -> Result<ApiResponse, ApiClientError> {
        let mut request = Map::new();
        request.insert(
            "MerchantTransactionId".into(),
            json!(merchant_transaction_id),
        );
        self.send(Endpoint::CheckStatus, &request).await
    }

    pub async fn check_status_by_gateway_id(
        &self,
        gateway_transaction_id: &str,
    ) -> Result<ApiResponse, ApiClientError> {
        let mut request = Map::new();
        request.insert("GatewayTransactionId".into(), json!(gateway_transaction_id));
        self.send(Endpoint::CheckStatus, &request).await
    }

    /// Sends to an endpoint given by name.
    pub async fn send_to(
        &self,
        endpoint: &str,
        data: &ApiRequest,
    ) -> Result<ApiResponse, ApiClientError> {
        let endpoint = endpoint.parse::<Endpoint>()?;
        self.send(endpoint, data).await
    }

    /// Validates, rate-limits and posts `data`, retrying transport failures and
    /// gateway errors with exponential backoff.
    pub async fn send(
        &self,
        endpoint: Endpoint,
        data: &ApiRequest,
    ) -> Result<ApiResponse, ApiClientError> {
        if let Err(err) = self.validator.check(endpoint.name(), data) {
            tracing::error!(endpoint = %endpoint, error = %err, "Invalid request data");
            return Err(err.into());
        }

        if !self.rate_limiter.allow().await {
            tracing::error!(endpoint = %endpoint, "Rate limit exceeded");
            return Err(ApiClientError::RateLimited);
        }

        let url = self.settings.endpoints.url(endpoint);
        let body = Value::Object(data.clone());
        let logged_payload = sanitize_json(&body);
        let retry = self.settings.retry;
        let operation_key = new_idempotency_key();

        for attempt in 1..=retry.max_attempts {
            let is_final = retry.is_final(attempt);
            let request_id = match self.settings.idempotency {
                IdempotencyStrategy::PerOperation => operation_key.clone(),
                IdempotencyStrategy::PerAttempt => new_idempotency_key(),
            };

            tracing::info!(
                endpoint = %endpoint,
                attempt,
                request_id = %request_id,
                payload = %logged_payload,
                "Sending MyPay API request"
            );

            let headers = [
                ("Content-Type", "application/json".to_string()),
                ("API_KEY", self.settings.credentials.api_key.clone()),
                ("X-Request-ID", request_id),
            ];

            let outcome = match self.requester.post_json(url, &headers, &body).await {
                Ok(raw) => classify(raw, is_final),
                Err(failure) => Err(ApiClientError::Transport {
                    attempts: attempt,
                    message: failure.0,
                }),
            };

            match outcome {
                Ok(response) => {
                    tracing::info!(
                        endpoint = %endpoint,
                        attempt,
                        response = %sanitize_json(&response.to_value()),
                        "MyPay API response received"
                    );
                    return Ok(response);
                }
                Err(err @ ApiClientError::Transport { .. }) if !is_final => {
                    tracing::error!(endpoint = %endpoint, attempt, error = %err, "MyPay API request failed");
                }
                Err(err @ ApiClientError::RetryableHttp { .. }) => {
                    tracing::warn!(endpoint = %endpoint, attempt, error = %err, "MyPay API attempt failed");
                }
                Err(err) => {
                    tracing::error!(endpoint = %endpoint, attempt, error = %err, "MyPay API request failed");
                    return Err(err);
                }
            }

            if !is_final {
                tokio::time::sleep(retry.backoff(attempt)).await;
            }
        }

        tracing::error!(endpoint = %endpoint, attempts = retry.max_attempts, "Max retries exceeded");
        Err(ApiClientError::RetriesExhausted {
            attempts: retry.max_attempts,
        })
    }
}

/// Maps a raw response onto the retry decision for one attempt.
fn classify(raw: RawResponse, is_final: bool) -> Result<ApiResponse, ApiClientError> {
    match raw.status {
        200 => ApiResponse::parse(&raw.body),
        status if RetryPolicy::is_retryable_status(status) && !is_final => {
            Err(ApiClientError::RetryableHttp { status })
        }
        status if status >= 400 => Err(ApiClientError::Api {
            status,
            message: error_message(status, &raw.body),
        }),
        // Other non-200 codes count as a failed attempt.
        status => Err(ApiClientError::RetryableHttp { status }),
    }
}

fn error_message(status: u16, body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("Message")
                .and_then(Value::as_str)
                .filter(|m| !m.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_else(|| format!("HTTP Error {}", status))
}

/// Two decimals, rounded half-up.
pub fn format_amount(amount: &BigDecimal) -> String {
    amount.round(2).with_scale(2).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn amounts_use_two_decimals() {
        assert_eq!(format_amount(&BigDecimal::from(250)), "250.00");
        assert_eq!(format_amount(&BigDecimal::from_str("10.5").unwrap()), "10.50");
        assert_eq!(format_amount(&BigDecimal::from_str("10.005").unwrap()), "10.01");
        assert_eq!(format_amount(&BigDecimal::from_str("10.004").unwrap()), "10.00");
    }

    #[test]
    fn error_message_prefers_processor_text() {
        assert_eq!(
            error_message(400, r#"{"Message": "Invalid merchant"}"#),
            "Invalid merchant"
        );
        assert_eq!(error_message(502, "<html>"), "HTTP Error 502");
    }

    #[test]
    fn exhausted_retryable_status_is_an_api_error() {
        let raw = RawResponse {
            status: 503,
            body: String::new(),
        };
        assert!(matches!(
            classify(raw.clone(), false),
            Err(ApiClientError::RetryableHttp { status: 503 })
        ));
        assert!(matches!(
            classify(raw, true),
            Err(ApiClientError::Api { status: 503, .. })
        ));
    }

    #[test]
    fn credentials_debug_is_masked() {
        let credentials = Credentials {
            api_key: "secret-key".into(),
            merchant_id: "M1".into(),
            username: "shop".into(),
            password: "hunter2".into(),
        };
        let debug = format!("{:?}", credentials);
        assert!(!debug.contains("secret-key"));
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("M1"));
    }
}
