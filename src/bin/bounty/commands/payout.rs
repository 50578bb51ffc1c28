//! Payout command - release part of a pool (admin only)

use crate::client::LedgerClient;
use crate::style::*;
use anyhow::{bail, Result};
use bounty_ledger::Address;

pub async fn run(client: &LedgerClient, id: &str, worker: Address, percentage: u32) -> Result<()> {
    if percentage > 100 {
        bail!("percentage must be between 0 and 100");
    }

    print_header("Bounty Payout");

    let receipt = client.payout(id, worker, percentage).await?;

    if receipt.amount == 0 {
        print_warning("Payout amount is 0 (pool below 10_000 or 0%)");
    } else {
        print_success(&format!(
            "Paid {} to {}",
            style_bold(&format_amount(receipt.amount)),
            style_cyan(receipt.worker.as_str())
        ));
    }
    println!("Receipt:  {}", style_dim(&receipt.receipt_id));

    Ok(())
}
