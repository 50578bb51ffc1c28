//! Show commands - bounty details and payout history

use crate::client::LedgerClient;
use crate::style::*;
use anyhow::Result;

pub async fn run(client: &LedgerClient, id: &str) -> Result<()> {
    let bounty = client.get_bounty(id).await?;

    print_header(&format!("Bounty {}", id));

    if !bounty.exists() {
        print_info("No bounty with this id has been funded yet.");
        return Ok(());
    }

    println!("Pool:      {}", style_green(&format_amount(bounty.pool)));
    println!(
        "Deadline:  {}",
        if bounty.deadline.is_empty() {
            style_dim("none")
        } else {
            bounty.deadline.clone()
        }
    );

    println!();
    println!("{}", style_bold("Funders:"));
    for funder in &bounty.funders {
        println!("  {}", funder);
    }

    println!();
    println!("{}", style_bold("Workers:"));
    if bounty.workers.is_empty() {
        println!("  {}", style_dim("none yet"));
    }
    for worker in &bounty.workers {
        println!("  {}", worker);
    }

    Ok(())
}

pub async fn run_payouts(client: &LedgerClient, id: &str) -> Result<()> {
    let payouts = client.list_payouts(id).await?;

    print_header(&format!("Payouts for {}", id));

    if payouts.is_empty() {
        print_info("No payouts yet.");
        return Ok(());
    }

    println!(
        "{:<20}  {:<14}  {:>4}  {:>16}  Paid by",
        "When", "Worker", "%", "Amount"
    );
    println!("{}", "─".repeat(75));

    for payout in &payouts {
        println!(
            "{:<20}  {:<14}  {:>4}  {:>16}  {}",
            payout.paid_at.format("%Y-%m-%d %H:%M:%S"),
            truncate_address(payout.worker.as_str()),
            payout.percentage,
            format_amount(payout.amount),
            style_dim(&truncate_address(payout.paid_by.as_str()))
        );
    }

    let total: u128 = payouts.iter().map(|p| p.amount).sum();
    println!();
    println!("Total paid: {}", style_bold(&format_amount(total)));

    Ok(())
}
