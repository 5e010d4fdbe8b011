use anyhow::{Context, Result};
use dotenvy::dotenv;
use serde_json::{json, Value};
use std::env;
use url::Url;

use crate::domain::OrderStatus;
use crate::gateway::{ClientSettings, Credentials, Endpoints, IdempotencyStrategy, RetryPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub test_mode: bool,
    /// Replaces both staging and production bases when set.
    pub api_base_url: Option<String>,
    pub credentials: Credentials,
    /// Status a paid order is moved to.
    pub order_status: OrderStatus,
    pub stable_idempotency_key: bool,
}

impl GatewayConfig {
    pub fn endpoints(&self) -> Endpoints {
        match &self.api_base_url {
            Some(base) => Endpoints::with_base(base),
            None => Endpoints::for_mode(self.test_mode),
        }
    }
}

/// Public URLs of the storefront.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreUrls {
    base: Url,
}

impl StoreUrls {
    pub fn new(mut base: Url) -> Self {
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Self { base }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let base = Url::parse(raw).with_context(|| format!("invalid store URL: {}", raw))?;
        Ok(Self::new(base))
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Where the processor sends the buyer back to.
    pub fn callback(&self) -> Url {
        let mut url = self.base.clone();
        let path = format!("{}mypay/callback", self.base.path());
        url.set_path(&path);
        url
    }

    /// Order confirmation page.
    pub fn thank_you(&self, order_id: i64) -> String {
        let mut url = self.base.clone();
        let path = format!("{}checkout/order-received/{}/", self.base.path(), order_id);
        url.set_path(&path);
        url.to_string()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub database_url: String,
    pub database_max_connections: u32,
    pub store_urls: StoreUrls,
    pub gateway: GatewayConfig,
    pub debug: bool,
    pub admin_api_key: Option<String>,
    pub admin_nonce_secret: Option<String>,
    pub rate_limit_redis_url: Option<String>,
    pub log_retention_days: i64,
    pub log_format: LogFormat,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok(); // Load .env file if present

        let order_status = env::var("MYPAY_ORDER_STATUS")
            .unwrap_or_else(|_| "processing".to_string())
            .parse::<OrderStatus>()
            .map_err(anyhow::Error::msg)?;

        let log_format = match env::var("LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };

        Ok(Config {
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?,
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            database_max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()?,
            store_urls: StoreUrls::parse(&env::var("STORE_URL").context("STORE_URL must be set")?)?,
            gateway: GatewayConfig {
                test_mode: env_flag("MYPAY_TEST_MODE", true),
                api_base_url: optional_var("MYPAY_API_BASE_URL"),
                credentials: Credentials {
                    api_key: required_var("MYPAY_API_KEY")?,
                    merchant_id: required_var("MYPAY_MERCHANT_ID")?,
                    username: required_var("MYPAY_USERNAME")?,
                    password: required_var("MYPAY_PASSWORD")?,
                },
                order_status,
                stable_idempotency_key: env_flag("MYPAY_STABLE_IDEMPOTENCY_KEY", false),
            },
            debug: env_flag("MYPAY_DEBUG", false),
            admin_api_key: optional_var("ADMIN_API_KEY"),
            admin_nonce_secret: optional_var("ADMIN_NONCE_SECRET"),
            rate_limit_redis_url: optional_var("RATE_LIMIT_REDIS_URL"),
            log_retention_days: env::var("LOG_RETENTION_DAYS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()?,
            log_format,
        })
    }

    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            endpoints: self.gateway.endpoints(),
            credentials: self.gateway.credentials.clone(),
            callback_url: self.store_urls.callback(),
            retry: RetryPolicy::default(),
            idempotency: IdempotencyStrategy::from_flag(self.gateway.stable_idempotency_key),
        }
    }

    /// Settings with every secret masked, for display.
    pub fn redacted(&self) -> Value {
        let endpoints = self.gateway.endpoints();
        let log_format = match self.log_format {
            LogFormat::Json => "json",
            LogFormat::Text => "text",
        };
        json!({
            "server_port": self.server_port,
            "database_url": mask(&self.database_url),
            "store_url": self.store_urls.base().as_str(),
            "mypay": {
                "test_mode": self.gateway.test_mode,
                "generate_order_url": endpoints.generate_order,
                "check_status_url": endpoints.check_status,
                "merchant_id": self.gateway.credentials.merchant_id,
                "api_key": mask(&self.gateway.credentials.api_key),
                "username": mask(&self.gateway.credentials.username),
                "password": mask(&self.gateway.credentials.password),
                "order_status": self.gateway.order_status.slug(),
                "stable_idempotency_key": self.gateway.stable_idempotency_key,
            },
            "debug": self.debug,
            "admin_api_key": self.admin_api_key.as_deref().map(mask),
            "rate_limit_redis_url": self.rate_limit_redis_url.as_deref().map(mask),
            "log_retention_days": self.log_retention_days,
            "log_format": log_format,
        })
    }
}

fn required_var(name: &str) -> Result<String> {
    optional_var(name).with_context(|| format!("{} must be set", name))
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn env_flag(name: &str, default: bool) -> bool {
    match env::var(name) {
        Ok(value) => parse_flag(&value).unwrap_or(default),
        Err(_) => default,
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn mask(value: &str) -> String {
    if value.is_empty() {
        String::new()
    } else {
        "********".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_urls_build_callback_and_thank_you_pages() {
        let urls = StoreUrls::parse("https://shop.example.com").unwrap();
        assert_eq!(
            urls.callback().as_str(),
            "https://shop.example.com/mypay/callback"
        );
        assert_eq!(
            urls.thank_you(42),
            "https://shop.example.com/checkout/order-received/42/"
        );
    }

    #[test]
    fn store_urls_keep_sub_path() {
        let urls = StoreUrls::parse("https://example.com/shop").unwrap();
        assert_eq!(
            urls.callback().as_str(),
            "https://example.com/shop/mypay/callback"
        );
    }

    #[test]
    fn flags_accept_common_spellings() {
        assert_eq!(parse_flag("yes"), Some(true));
        assert_eq!(parse_flag(" 0 "), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn base_url_override_wins_over_test_mode() {
        let gateway = GatewayConfig {
            test_mode: false,
            api_base_url: Some("http://localhost:9000".to_string()),
            credentials: Credentials {
                api_key: "k".into(),
                merchant_id: "m".into(),
                username: "u".into(),
                password: "p".into(),
            },
            order_status: OrderStatus::Processing,
            stable_idempotency_key: false,
        };
        assert_eq!(
            gateway.endpoints().generate_order,
            "http://localhost:9000/api/use-mypay-payments"
        );
    }
}
