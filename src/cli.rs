use clap::{Parser, Subcommand};
use std::sync::Arc;

use crate::adapters::{PostgresOrderStore, PostgresTransactionLog};
use crate::config::Config;
use crate::ports::TransactionLog;
use crate::services::{prune_transaction_logs, Reconciler};
use crate::startup::build_api_client;

#[derive(Parser)]
#[command(name = "mypay-gateway")]
#[command(about = "MyPay Gateway - payment initiation and transaction reconciliation", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve,

    /// Transaction commands
    #[command(subcommand)]
    Tx(TxCommands),

    /// Database management commands
    #[command(subcommand)]
    Db(DbCommands),

    /// Show the effective configuration with secrets masked
    Config,
}

#[derive(Subcommand)]
pub enum TxCommands {
    /// Ask MyPay for the current status of a transaction
    Check {
        /// Merchant transaction id (gateway transaction id with --gateway)
        #[arg(value_name = "ID")]
        id: String,

        /// Treat ID as a gateway transaction id
        #[arg(long)]
        gateway: bool,
    },

    /// Print the transaction log row for a merchant transaction id
    Show {
        #[arg(value_name = "MERCHANT_TXN_ID")]
        merchant_transaction_id: String,
    },

    /// Re-check an order's transaction and update the order
    Reconcile {
        #[arg(value_name = "ORDER_ID")]
        order_id: i64,
    },

    /// Delete finished transaction log rows older than the retention period
    Prune {
        /// Retention in days (defaults to LOG_RETENTION_DAYS)
        #[arg(long)]
        days: Option<i64>,
    },
}

#[derive(Subcommand)]
pub enum DbCommands {
    /// Run database migrations
    Migrate,
}

pub async fn handle_tx_check(config: &Config, id: &str, gateway: bool) -> anyhow::Result<()> {
    let client = build_api_client(config)?;
    let response = if gateway {
        client.check_status_by_gateway_id(id).await?
    } else {
        client.check_status(id).await?
    };

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

pub async fn handle_tx_show(config: &Config, merchant_transaction_id: &str) -> anyhow::Result<()> {
    let pool = crate::db::create_pool(config).await?;
    let log = PostgresTransactionLog::new(pool);

    match log.find_by_merchant_id(merchant_transaction_id).await? {
        Some(tx) => {
            println!("{}", serde_json::to_string_pretty(&tx)?);
            Ok(())
        }
        None => {
            tracing::warn!("Transaction {} not found", merchant_transaction_id);
            anyhow::bail!("Transaction {} not found", merchant_transaction_id)
        }
    }
}

pub async fn handle_tx_reconcile(config: &Config, order_id: i64) -> anyhow::Result<()> {
    let pool = crate::db::create_pool(config).await?;
    let reconciler = Reconciler::new(
        build_api_client(config)?,
        Arc::new(PostgresOrderStore::new(pool.clone())),
        Arc::new(PostgresTransactionLog::new(pool)),
        config.store_urls.clone(),
        config.gateway.order_status,
    );

    let outcome = reconciler.reconcile_order(order_id).await?;
    match outcome.status {
        Some(status) => println!("✓ Order {} reconciled: {}", order_id, status.label()),
        None => println!("Order {} left unchanged: status unavailable", order_id),
    }
    Ok(())
}

pub async fn handle_tx_prune(config: &Config, days: Option<i64>) -> anyhow::Result<()> {
    let pool = crate::db::create_pool(config).await?;
    let log = PostgresTransactionLog::new(pool);
    let days = days.unwrap_or(config.log_retention_days);

    let removed = prune_transaction_logs(&log, days).await?;
    println!("✓ Removed {} transaction log rows older than {} days", removed, days);
    Ok(())
}

pub async fn handle_db_migrate(config: &Config) -> anyhow::Result<()> {
    let pool = crate::db::create_pool(config).await?;

    tracing::info!("Running database migrations...");
    crate::db::run_migrations(&pool).await?;
    println!("✓ Database migrations completed");

    Ok(())
}

pub fn handle_config_show(config: &Config) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(&config.redacted())?);
    Ok(())
}
