//! Work command - register as a worker

use crate::client::LedgerClient;
use crate::style::*;
use anyhow::Result;

pub async fn run(client: &LedgerClient, id: &str) -> Result<()> {
    let bounty = client.start_work(id).await?;

    print_success(&format!("Registered as worker on {}", style_cyan(id)));
    println!("Workers on this bounty: {}", bounty.workers.len());

    Ok(())
}
