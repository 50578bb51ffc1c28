//! Bounty Ledger Server
//!
//! Escrow pools for issue bounties with admin-gated payouts

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use bounty_ledger::{AdminRegistry, BountyLedger, Config, LedgerStorage};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bounty-ledger-server")]
#[command(version)]
#[command(about = "Bounty Ledger - escrow server for issue bounties", long_about = None)]
struct Args {
    /// Path to config.toml (embedded defaults are used if missing)
    #[arg(short, long, env = "LEDGER_CONFIG", default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = Config::load_from(&args.config)?;

    info!("Starting Bounty Ledger Server");

    let storage = Arc::new(
        LedgerStorage::new(&config.database.path).with_context(|| {
            format!(
                "Failed to open ledger database {}",
                config.database.path.display()
            )
        })?,
    );
    info!("Ledger storage opened at {}", config.database.path.display());

    let admins = Arc::new(AdminRegistry::bootstrap(
        storage.clone(),
        &config.initializer()?,
    )?);
    if let Some(initializer) = admins.initializer()? {
        info!("Admin registry initialized by {}", initializer);
    }

    let gateway = config.transfer_gateway()?;
    info!("Transfer gateway: {:?}", config.transfer.mode);

    let ledger = Arc::new(BountyLedger::new(storage, admins, gateway));

    bounty_ledger::server::run_server(&config.server.host, config.server.port, ledger).await?;

    Ok(())
}
