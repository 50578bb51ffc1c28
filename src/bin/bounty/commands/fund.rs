//! Fund command - deposit into a bounty

use crate::client::LedgerClient;
use crate::style::*;
use anyhow::{bail, Result};

pub async fn run(client: &LedgerClient, id: &str, value: u128, deadline: &str) -> Result<()> {
    if value == 0 {
        bail!("value must be greater than zero");
    }

    print_header("Fund Bounty");

    let bounty = client.fund(id, deadline, value).await?;

    print_success(&format!(
        "Deposited {} into {}",
        style_bold(&format_amount(value)),
        style_cyan(id)
    ));
    println!("Pool:     {}", style_green(&format_amount(bounty.pool)));
    println!("Funders:  {}", bounty.funders.len());
    if !deadline.is_empty() && bounty.deadline != deadline {
        print_warning(&format!(
            "Bounty already existed; its deadline stays '{}'",
            bounty.deadline
        ));
    }

    Ok(())
}
