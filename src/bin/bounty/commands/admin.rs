//! Admin commands - inspect and manage administrators

use crate::client::LedgerClient;
use crate::style::*;
use anyhow::Result;
use bounty_ledger::Address;

pub async fn list(client: &LedgerClient) -> Result<()> {
    let admins = client.list_admins().await?;

    print_header("Administrators");
    if admins.is_empty() {
        print_warning("No administrators. Privileged operations are disabled.");
    }
    for admin in &admins {
        println!("  {}", admin);
    }

    Ok(())
}

pub async fn check(client: &LedgerClient, address: &Address) -> Result<()> {
    let status = client.check_admin(address).await?;
    if status.is_admin {
        print_success(&format!("{} is an administrator", status.address));
    } else {
        print_info(&format!("{} is not an administrator", status.address));
    }
    Ok(())
}

pub async fn add(client: &LedgerClient, address: &Address) -> Result<()> {
    let status = client.add_admin(address).await?;
    print_success(&format!("Authorized {}", style_cyan(status.address.as_str())));
    Ok(())
}

pub async fn remove(client: &LedgerClient, address: &Address) -> Result<()> {
    let status = client.remove_admin(address).await?;
    print_success(&format!("Revoked {}", style_yellow(status.address.as_str())));
    Ok(())
}
