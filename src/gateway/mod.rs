//! MyPay API client: request building, validation, rate limiting, retries.

pub mod client;
pub mod error;
pub mod requester;
pub mod retry;
pub mod types;

pub use client::{ClientSettings, Credentials, PaymentApiClient};
pub use error::ApiClientError;
pub use requester::{HttpRequester, RawResponse, ReqwestRequester, TransportFailure};
pub use retry::{IdempotencyStrategy, RetryPolicy};
pub use types::{ApiRequest, ApiResponse, Endpoint, Endpoints};
