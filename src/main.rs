use clap::Parser;
use std::net::SocketAddr;

use mypay_gateway::cli::{Cli, Commands, DbCommands, TxCommands};
use mypay_gateway::config::Config;
use mypay_gateway::{cli, create_app, db, startup, telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    telemetry::init(config.debug, config.log_format);

    match cli.command {
        None | Some(Commands::Serve) => serve(config).await,
        Some(Commands::Tx(tx_cmd)) => match tx_cmd {
            TxCommands::Check { id, gateway } => cli::handle_tx_check(&config, &id, gateway).await,
            TxCommands::Show {
                merchant_transaction_id,
            } => cli::handle_tx_show(&config, &merchant_transaction_id).await,
            TxCommands::Reconcile { order_id } => {
                cli::handle_tx_reconcile(&config, order_id).await
            }
            TxCommands::Prune { days } => cli::handle_tx_prune(&config, days).await,
        },
        Some(Commands::Db(db_cmd)) => match db_cmd {
            DbCommands::Migrate => cli::handle_db_migrate(&config).await,
        },
        Some(Commands::Config) => cli::handle_config_show(&config),
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let pool = db::create_pool(&config).await?;
    db::run_migrations(&pool).await?;

    let report = startup::validate_environment(&config, &pool).await;
    report.print();
    if !report.is_valid() {
        anyhow::bail!("Startup validation failed");
    }

    let state = startup::build_state(&config, pool)?;
    tracing::info!(
        generate_order_url = %config.gateway.endpoints().generate_order,
        test_mode = config.gateway.test_mode,
        "MyPay client initialized"
    );

    let app = create_app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    tracing::info!("listening on {}", addr);

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}
