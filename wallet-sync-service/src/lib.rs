pub mod cli;
pub mod config;
pub mod error;
pub mod ledger;
pub mod rpc;

use anyhow::Result;
use clap::Parser;
use cli::{BalancesCmd, Cli, Commands, RunCmd};
use config::{load_config, ServiceConfig};
use ledger::HttpLedger;
use rpc::EthRpcClient;
use std::sync::Arc;
use tokio::{signal, sync::watch};
use wallet_sync_connector::{SyncContext, SyncOrchestrator};

/// The main entry point for running the service application logic.
/// This function handles CLI parsing, configuration, and dispatches the subcommand.
pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run(cmd) => {
            let config = load_config_for_run(&cmd)?;
            wallet_sync_logger::init(&config.service.log)?;
            tracing::info!("Configuration loaded: {:#?}", &config);
            run_rounds(config).await
        }
        Commands::Balances(cmd) => {
            let config = load_config_for_balances(&cmd)?;
            wallet_sync_logger::init(&config.service.log)?;
            run_balances(config).await
        }
    }
}

/// Loads the configuration and applies the `run` overrides on top of it.
pub fn load_config_for_run(cmd: &RunCmd) -> Result<ServiceConfig> {
    let mut config = load_from(cmd.config.as_deref())?;
    apply_run_overrides(&mut config, cmd);
    Ok(config)
}

fn load_config_for_balances(cmd: &BalancesCmd) -> Result<ServiceConfig> {
    load_from(cmd.config.as_deref())
}

fn load_from(path: Option<&str>) -> Result<ServiceConfig> {
    match path {
        Some(path) => println!("Loading configuration from '{}'", path),
        None => println!("No config file provided, using defaults and environment."),
    }
    load_config(path)
}

/// CLI flags win over file and environment settings.
pub fn apply_run_overrides(config: &mut ServiceConfig, cmd: &RunCmd) {
    let scan = &mut config.connector.scan;
    if cmd.from_block.is_some() {
        scan.start_block = cmd.from_block;
    }
    if cmd.to_block.is_some() {
        scan.end_block = cmd.to_block;
    }
    if cmd.once {
        config.connector.schedule.interval_secs = None;
        config.connector.schedule.max_rounds = Some(1);
    }
}

/// Wires the HTTP collaborators into a connector context.
pub fn build_context(config: &ServiceConfig) -> Result<SyncContext> {
    let chain = EthRpcClient::new(&config.service.node, config.connector.token.decimals)?;
    let ledger = HttpLedger::new(&config.service.ledger)?;
    Ok(SyncContext::new(
        Arc::new(config.connector.clone()),
        Arc::new(chain),
        Arc::new(ledger),
    ))
}

/// Runs synchronization rounds until the schedule ends or Ctrl+C is received.
async fn run_rounds(config: ServiceConfig) -> Result<()> {
    let orchestrator = SyncOrchestrator::new(build_context(&config)?);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Received Ctrl+C, finishing the current round before shutdown...");
                let _ = shutdown_tx.send(true);
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to listen for shutdown signal.");
            }
        }
    });

    let reports = orchestrator.run(shutdown_rx).await?;
    let incomplete = reports.iter().filter(|r| !r.is_complete()).count();
    tracing::info!(rounds = reports.len(), incomplete, "Shutdown complete.");
    Ok(())
}

async fn run_balances(config: ServiceConfig) -> Result<()> {
    let orchestrator = SyncOrchestrator::new(build_context(&config)?);
    let report = orchestrator.report_balances().await?;
    tracing::info!(
        addresses = report.balances.len(),
        total = %report.total,
        "Balance job finished."
    );
    Ok(())
}
