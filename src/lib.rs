//! Bounty Ledger - Escrow pools for issue bounties
//!
//! Funders deposit value against an issue id, contributors register as
//! workers on it, and an administrator releases part of the pool to a
//! chosen recipient.
//!
//! # How it works
//!
//! 1. The first deposit under an id creates the bounty and fixes its deadline
//! 2. Further deposits grow the pool; each funder is listed once
//! 3. Workers register on an existing bounty, once each
//! 4. An admin pays out a percentage of the pool truncated to 10000 units
//! 5. A failed transfer leaves the pool untouched
//!
//! # Notes
//!
//! - The deadline is stored and reported but never enforced
//! - Payout recipients are not required to be registered workers
//! - Bounties are never deleted, even once drained

pub mod admin;
pub mod auth;
pub mod bounty;
pub mod config;
pub mod error;
pub mod ledger;
pub mod locks;
pub mod server;
pub mod storage;
pub mod transfer;

pub use admin::AdminRegistry;
pub use auth::{is_valid_address, Address};
pub use bounty::{payout_amount, Bounty, PayoutReceipt, PAYOUT_UNIT};
pub use config::Config;
pub use error::{ErrorKind, LedgerError, LedgerResult};
pub use ledger::BountyLedger;
pub use storage::LedgerStorage;
pub use transfer::{DryRunTransferGateway, HttpTransferGateway, TransferGateway};
