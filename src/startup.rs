use anyhow::{Context, Result};
use chrono::Duration;
use sqlx::PgPool;
use std::sync::Arc;

use crate::adapters::{PostgresOrderStore, PostgresTransactionLog};
use crate::config::Config;
use crate::gateway::{PaymentApiClient, ReqwestRequester};
use crate::rate_limit::{
    RateLimiter, RedisWindowLimiter, SlidingWindowLimiter, DEFAULT_MAX_CALLS, DEFAULT_WINDOW,
};
use crate::services::NonceService;
use crate::AppState;

const NONCE_TTL_HOURS: i64 = 12;

pub struct ValidationReport {
    pub environment: bool,
    pub database: bool,
    pub redis: bool,
    pub errors: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.environment && self.database && self.redis
    }

    pub fn print(&self) {
        println!("\n=== Startup Validation Report ===");
        println!("Environment Variables: {}", status(self.environment));
        println!("Database Connectivity: {}", status(self.database));
        println!("Redis Connectivity:    {}", status(self.redis));

        if !self.errors.is_empty() {
            println!("\nErrors:");
            for error in &self.errors {
                println!("  ❌ {}", error);
            }
        }

        println!("\nOverall Status: {}", if self.is_valid() { "✅ PASS" } else { "❌ FAIL" });
        println!("=================================\n");
    }
}

fn status(ok: bool) -> &'static str {
    if ok { "✅ OK" } else { "❌ FAIL" }
}

pub async fn validate_environment(config: &Config, pool: &PgPool) -> ValidationReport {
    let mut report = ValidationReport {
        environment: true,
        database: true,
        redis: true,
        errors: Vec::new(),
    };

    if let Err(e) = validate_env_vars(config) {
        report.environment = false;
        report.errors.push(format!("Environment: {}", e));
    }

    if let Err(e) = validate_database(pool).await {
        report.database = false;
        report.errors.push(format!("Database: {}", e));
    }

    if let Some(redis_url) = &config.rate_limit_redis_url {
        if let Err(e) = validate_redis(redis_url).await {
            report.redis = false;
            report.errors.push(format!("Redis: {}", e));
        }
    }

    report
}

fn validate_env_vars(config: &Config) -> Result<()> {
    if config.server_port == 0 {
        anyhow::bail!("SERVER_PORT must be greater than 0");
    }
    if config.log_retention_days < 1 {
        anyhow::bail!("LOG_RETENTION_DAYS must be at least 1");
    }
    if !config.gateway.test_mode && config.store_urls.base().scheme() != "https" {
        anyhow::bail!("STORE_URL must use https in production mode");
    }
    Ok(())
}

async fn validate_database(pool: &PgPool) -> Result<()> {
    sqlx::query("SELECT 1")
        .fetch_one(pool)
        .await
        .context("Failed to connect to database")?;

    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations")
        .fetch_one(pool)
        .await
        .context("Failed to check migrations table")?;

    if applied == 0 {
        anyhow::bail!("No migrations applied");
    }

    Ok(())
}

async fn validate_redis(redis_url: &str) -> Result<()> {
    let client = redis::Client::open(redis_url).context("Invalid Redis URL")?;

    let mut conn = client
        .get_multiplexed_async_connection()
        .await
        .context("Failed to connect to Redis")?;

    redis::cmd("PING")
        .query_async::<_, String>(&mut conn)
        .await
        .context("Redis PING failed")?;

    Ok(())
}

pub fn build_rate_limiter(config: &Config) -> Result<Arc<dyn RateLimiter>> {
    match &config.rate_limit_redis_url {
        Some(url) => {
            tracing::info!("Using shared Redis rate limiter");
            Ok(Arc::new(RedisWindowLimiter::new(
                url,
                DEFAULT_MAX_CALLS,
                DEFAULT_WINDOW,
            )?))
        }
        None => Ok(Arc::new(SlidingWindowLimiter::default())),
    }
}

pub fn build_api_client(config: &Config) -> Result<Arc<PaymentApiClient>> {
    let requester = ReqwestRequester::new().context("Failed to build HTTP client")?;
    Ok(Arc::new(PaymentApiClient::new(
        config.client_settings(),
        Arc::new(requester),
        build_rate_limiter(config)?,
    )))
}

pub fn build_state(config: &Config, pool: PgPool) -> Result<AppState> {
    let nonce_secret = match &config.admin_nonce_secret {
        Some(secret) => secret.clone(),
        None => {
            tracing::warn!("ADMIN_NONCE_SECRET not set, admin nonces will not survive a restart");
            uuid::Uuid::new_v4().to_string()
        }
    };

    Ok(AppState::new(
        build_api_client(config)?,
        Arc::new(PostgresOrderStore::new(pool.clone())),
        Arc::new(PostgresTransactionLog::new(pool)),
        config.store_urls.clone(),
        config.gateway.order_status,
        NonceService::new(nonce_secret, Duration::hours(NONCE_TTL_HOURS)),
        config.admin_api_key.clone(),
    ))
}
