use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use super::error::ApiClientError;
use crate::validation::schema;

/// Flat string-keyed request body.
pub type ApiRequest = Map<String, Value>;

const STAGING_BASE: &str = "https://stagingapi1.mypay.com.np";
const PRODUCTION_BASE: &str = "https://smartdigitalnepal.com";
const GENERATE_ORDER_PATH: &str = "/api/use-mypay-payments";
const CHECK_STATUS_PATH: &str = "/api/use-mypay-payments-status";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    GenerateOrder,
    CheckStatus,
}

impl Endpoint {
    /// Name of the endpoint, which is also the name of its request schema.
    pub fn name(&self) -> &'static str {
        match self {
            Endpoint::GenerateOrder => schema::GENERATE_ORDER,
            Endpoint::CheckStatus => schema::CHECK_STATUS,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Endpoint {
    type Err = ApiClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            schema::GENERATE_ORDER => Ok(Endpoint::GenerateOrder),
            schema::CHECK_STATUS => Ok(Endpoint::CheckStatus),
            other => Err(ApiClientError::UnknownEndpoint(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub generate_order: String,
    pub check_status: String,
}

impl Endpoints {
    pub fn staging() -> Self {
        Self::with_base(STAGING_BASE)
    }

    pub fn production() -> Self {
        Self::with_base(PRODUCTION_BASE)
    }

    pub fn for_mode(test_mode: bool) -> Self {
        if test_mode {
            Self::staging()
        } else {
            Self::production()
        }
    }

    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            generate_order: format!("{}{}", base, GENERATE_ORDER_PATH),
            check_status: format!("{}{}", base, CHECK_STATUS_PATH),
        }
    }

    pub fn url(&self, endpoint: Endpoint) -> &str {
        match endpoint {
            Endpoint::GenerateOrder => &self.generate_order,
            Endpoint::CheckStatus => &self.check_status,
        }
    }
}

/// Decoded 200 response. Holds the full body; the typed accessors cover the
/// fields the gateway reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiResponse(Map<String, Value>);

impl ApiResponse {
    /// Requires an object carrying non-null `status` and `Message` keys.
    pub fn from_value(value: Value) -> Result<Self, ApiClientError> {
        let map = match value {
            Value::Object(map) => map,
            _ => {
                return Err(ApiClientError::InvalidResponse(
                    "response body is not a JSON object".to_string(),
                ))
            }
        };

        for key in ["status", "Message"] {
            if map.get(key).map_or(true, Value::is_null) {
                return Err(ApiClientError::InvalidResponse(format!(
                    "missing `{}` field",
                    key
                )));
            }
        }

        Ok(Self(map))
    }

    pub fn parse(body: &str) -> Result<Self, ApiClientError> {
        let value: Value = serde_json::from_str(body)
            .map_err(|e| ApiClientError::InvalidResponse(format!("invalid JSON: {}", e)))?;
        Self::from_value(value)
    }

    pub fn succeeded(&self) -> bool {
        self.0.get("status").and_then(Value::as_bool) == Some(true)
    }

    pub fn message(&self) -> Option<&str> {
        self.str_field("Message")
    }

    pub fn redirect_url(&self) -> Option<&str> {
        self.str_field("RedirectURL")
    }

    pub fn merchant_transaction_id(&self) -> Option<&str> {
        self.str_field("MerchantTransactionId")
    }

    pub fn gateway_transaction_id(&self) -> Option<&str> {
        self.str_field("GatewayTransactionId")
    }

    /// Integer `Status` code; numeric strings are accepted as well.
    pub fn status_code(&self) -> Option<i64> {
        match self.0.get("Status")? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn remarks(&self) -> &str {
        self.str_field("Remarks").unwrap_or("")
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn endpoints_switch_on_test_mode() {
        assert_eq!(
            Endpoints::for_mode(true).url(Endpoint::GenerateOrder),
            "https://stagingapi1.mypay.com.np/api/use-mypay-payments"
        );
        assert_eq!(
            Endpoints::for_mode(false).url(Endpoint::CheckStatus),
            "https://smartdigitalnepal.com/api/use-mypay-payments-status"
        );
        assert_eq!(
            Endpoints::with_base("http://127.0.0.1:1234/").url(Endpoint::CheckStatus),
            "http://127.0.0.1:1234/api/use-mypay-payments-status"
        );
    }

    #[test]
    fn unknown_endpoint_is_rejected() {
        assert_eq!(
            "check_status".parse::<Endpoint>().unwrap(),
            Endpoint::CheckStatus
        );
        let err = "refund".parse::<Endpoint>().unwrap_err();
        assert!(matches!(err, ApiClientError::UnknownEndpoint(name) if name == "refund"));
    }

    #[test]
    fn response_requires_status_and_message() {
        assert!(ApiResponse::from_value(json!({"status": true, "Message": "ok"})).is_ok());
        assert!(ApiResponse::from_value(json!({"status": true})).is_err());
        assert!(ApiResponse::from_value(json!({"Message": "ok"})).is_err());
        assert!(ApiResponse::from_value(json!({"status": null, "Message": "ok"})).is_err());
        assert!(ApiResponse::from_value(json!([1, 2])).is_err());
        assert!(ApiResponse::parse("not json").is_err());
    }

    #[test]
    fn reads_status_code_from_number_or_string() {
        let numeric =
            ApiResponse::from_value(json!({"status": true, "Message": "", "Status": 1})).unwrap();
        assert_eq!(numeric.status_code(), Some(1));

        let text =
            ApiResponse::from_value(json!({"status": true, "Message": "", "Status": "3"})).unwrap();
        assert_eq!(text.status_code(), Some(3));

        let missing = ApiResponse::from_value(json!({"status": true, "Message": ""})).unwrap();
        assert_eq!(missing.status_code(), None);
        assert_eq!(missing.remarks(), "");
    }
}
