use clap::{Parser, Subcommand};

/// The main CLI structure for the wallet-sync service.
#[derive(Parser, Debug)]
#[command(name = "wallet-sync", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Defines the available subcommands for the application.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run synchronization rounds: snapshot balances, scan blocks, submit histories.
    Run(RunCmd),
    /// Submit the native balances of all tracked addresses once.
    Balances(BalancesCmd),
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunCmd {
    /// Path to the configuration TOML file.
    /// If not provided, default values and environment variables are used.
    #[arg(short, long)]
    pub config: Option<String>,

    /// First block to scan. Overrides `connector.scan.start-block`.
    #[arg(long)]
    pub from_block: Option<u64>,

    /// Last block to scan. Overrides `connector.scan.end-block`.
    #[arg(long)]
    pub to_block: Option<u64>,

    /// Run a single round even if a schedule is configured.
    #[arg(long)]
    pub once: bool,
}

/// Arguments for the `balances` subcommand.
#[derive(Parser, Debug)]
pub struct BalancesCmd {
    /// Path to the configuration TOML file.
    #[arg(short, long)]
    pub config: Option<String>,
}
