//! Bounty Ledger CLI
//!
//! Command-line interface for the Bounty Ledger server.

mod client;
mod commands;
mod style;

use bounty_ledger::Address;
use clap::{Parser, Subcommand};
use client::LedgerClient;
use style::*;

#[derive(Parser)]
#[command(name = "bounty")]
#[command(author = "CortexLM")]
#[command(version)]
#[command(about = "Bounty Ledger - fund, work on and pay out issue bounties", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Ledger server URL
    #[arg(
        short,
        long,
        env = "LEDGER_URL",
        default_value = "http://127.0.0.1:8080",
        global = true
    )]
    server: String,

    /// Your account address, sent as the caller of mutating commands
    #[arg(short, long, env = "LEDGER_CALLER", global = true)]
    caller: Option<Address>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deposit value into a bounty (creates it on first deposit)
    #[command(visible_alias = "f")]
    Fund {
        /// Bounty id, e.g. the issue reference
        id: String,
        /// Amount to attach
        value: u128,
        /// Deadline recorded when the bounty is created
        #[arg(short, long, default_value = "")]
        deadline: String,
    },

    /// Register yourself as a worker on a bounty
    #[command(visible_alias = "w")]
    Work { id: String },

    /// Pay a percentage of the pool to a worker (admin only)
    #[command(visible_alias = "p")]
    Payout {
        id: String,
        worker: Address,
        /// 0 to 100
        percentage: u32,
    },

    /// Show a bounty
    #[command(visible_alias = "s")]
    Show { id: String },

    /// List payouts made from a bounty
    Payouts { id: String },

    /// Manage administrators
    #[command(subcommand)]
    Admin(AdminCommands),
}

#[derive(Subcommand)]
enum AdminCommands {
    /// List current administrators
    List,
    /// Check whether an address is an administrator
    Check { address: Address },
    /// Authorize an address (admin only)
    Add { address: Address },
    /// Revoke an address (admin only)
    Remove { address: Address },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt().with_env_filter("info").init();
    }

    let client = LedgerClient::new(&cli.server, cli.caller);

    let result = match cli.command {
        Commands::Fund {
            id,
            value,
            deadline,
        } => commands::fund::run(&client, &id, value, &deadline).await,
        Commands::Work { id } => commands::work::run(&client, &id).await,
        Commands::Payout {
            id,
            worker,
            percentage,
        } => commands::payout::run(&client, &id, worker, percentage).await,
        Commands::Show { id } => commands::show::run(&client, &id).await,
        Commands::Payouts { id } => commands::show::run_payouts(&client, &id).await,
        Commands::Admin(cmd) => match cmd {
            AdminCommands::List => commands::admin::list(&client).await,
            AdminCommands::Check { address } => commands::admin::check(&client, &address).await,
            AdminCommands::Add { address } => commands::admin::add(&client, &address).await,
            AdminCommands::Remove { address } => commands::admin::remove(&client, &address).await,
        },
    };

    if let Err(e) = result {
        print_error(&format!("{}", e));
        std::process::exit(1);
    }
}
