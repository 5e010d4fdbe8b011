use thiserror::Error;

use crate::validation::ValidationError;

#[derive(Debug, Error)]
pub enum ApiClientError {
    #[error("Invalid API endpoint: {0}")]
    UnknownEndpoint(String),

    #[error("Invalid request data: {0}")]
    Validation(#[from] ValidationError),

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Transport error after {attempts} attempts: {message}")]
    Transport { attempts: u32, message: String },

    #[error("Retryable HTTP status {status}")]
    RetryableHttp { status: u16 },

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    #[error("Maximum retries ({attempts}) exceeded")]
    RetriesExhausted { attempts: u32 },
}

impl ApiClientError {
    /// Message meant for the buyer. Only processor-provided text is passed
    /// through; everything else stays internal.
    pub fn processor_message(&self) -> Option<&str> {
        match self {
            ApiClientError::Api { message, .. } => Some(message),
            _ => None,
        }
    }
}
