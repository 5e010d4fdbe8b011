//! Outbound HTTPS POST. The seam the client is tested through.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

#[derive(Debug, Error)]
#[error("{0}")]
pub struct TransportFailure(pub String);

#[async_trait]
pub trait HttpRequester: Send + Sync {
    async fn post_json(
        &self,
        url: &str,
        headers: &[(&'static str, String)],
        body: &Value,
    ) -> Result<RawResponse, TransportFailure>;
}

/// reqwest-backed requester. Certificate verification stays on in every mode.
#[derive(Clone)]
pub struct ReqwestRequester {
    client: Client,
}

impl ReqwestRequester {
    pub fn new() -> Result<Self, TransportFailure> {
        Self::with_timeout(REQUEST_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, TransportFailure> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportFailure(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpRequester for ReqwestRequester {
    async fn post_json(
        &self,
        url: &str,
        headers: &[(&'static str, String)],
        body: &Value,
    ) -> Result<RawResponse, TransportFailure> {
        let mut request = self.client.post(url);
        for (name, value) in headers {
            request = request.header(*name, value);
        }
        // Headers first so `json` keeps the explicit Content-Type.
        let request = request.json(body);

        let response = request
            .send()
            .await
            .map_err(|e| TransportFailure(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportFailure(e.to_string()))?;

        Ok(RawResponse { status, body })
    }
}
