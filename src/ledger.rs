//! Bounty ledger
//!
//! Every mutation loads the current record for an id, applies one change and
//! commits it before returning, all while holding that id's lock.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::admin::AdminRegistry;
use crate::auth::Address;
use crate::bounty::{payout_amount, validate_percentage, Bounty, PayoutReceipt};
use crate::error::{LedgerError, LedgerResult};
use crate::locks::IdLocks;
use crate::storage::LedgerStorage;
use crate::transfer::{TransferGateway, TransferRequest};

pub struct BountyLedger {
    storage: Arc<LedgerStorage>,
    admins: Arc<AdminRegistry>,
    transfers: Arc<dyn TransferGateway>,
    locks: IdLocks,
}

impl BountyLedger {
    pub fn new(
        storage: Arc<LedgerStorage>,
        admins: Arc<AdminRegistry>,
        transfers: Arc<dyn TransferGateway>,
    ) -> Self {
        Self {
            storage,
            admins,
            transfers,
            locks: IdLocks::new(),
        }
    }

    pub fn admins(&self) -> &AdminRegistry {
        &self.admins
    }

    /// Deposit `attached_value` into bounty `id`, creating it on first deposit.
    ///
    /// `deadline` is only recorded by the creating deposit.
    pub async fn fund_bounty(
        &self,
        id: &str,
        deadline: &str,
        attached_value: u128,
        caller: &Address,
    ) -> LedgerResult<Bounty> {
        if attached_value == 0 {
            return Err(LedgerError::NoFundsAttached);
        }
        if id.is_empty() {
            return Err(LedgerError::EmptyBountyId);
        }

        let _guard = self.locks.acquire(id).await;

        let mut bounty = self.storage.load_bounty(id)?;
        if bounty.exists() {
            bounty.deposit(attached_value, caller.clone())?;
        } else {
            bounty = Bounty::open(id, deadline, attached_value, caller.clone());
            info!("Bounty {} created by {} (deadline '{}')", id, caller, deadline);
        }
        self.storage.save_bounty(&bounty)?;

        info!(
            "Bounty {} funded with {} by {} (pool {})",
            id, attached_value, caller, bounty.pool
        );
        Ok(bounty)
    }

    /// Register `caller` as a worker on an existing bounty
    pub async fn start_work(&self, id: &str, caller: &Address) -> LedgerResult<Bounty> {
        let _guard = self.locks.acquire(id).await;

        let mut bounty = self.storage.load_bounty(id)?;
        if !bounty.exists() {
            return Err(LedgerError::NoBountyWithId(id.to_string()));
        }
        bounty.add_worker(caller.clone())?;
        self.storage.save_bounty(&bounty)?;

        info!("{} started work on bounty {}", caller, id);
        Ok(bounty)
    }

    /// Release `percentage` of the pool to `worker`. Admin only.
    ///
    /// `worker` does not have to be a registered worker. The decremented
    /// pool is only committed once the transfer has succeeded. Authorization
    /// is checked when the call starts; revoking the caller afterwards does
    /// not cancel a payout already in flight.
    pub async fn payout_bounty(
        &self,
        id: &str,
        worker: &Address,
        percentage: u32,
        caller: &Address,
    ) -> LedgerResult<PayoutReceipt> {
        self.admins.ensure_admin(caller)?;
        if worker.is_zero() {
            return Err(LedgerError::CannotPayoutZeroAddress);
        }
        validate_percentage(percentage)?;

        let _guard = self.locks.acquire(id).await;

        let before = self.storage.load_bounty(id)?;
        if !before.exists() {
            return Err(LedgerError::NoBountyWithId(id.to_string()));
        }

        // the id lock keeps `after` valid until it is saved
        let amount = payout_amount(before.pool, percentage);
        let mut after = before.clone();
        after.withdraw(amount)?;

        let receipt_id = Uuid::new_v4().to_string();
        let request = TransferRequest {
            to: worker.clone(),
            amount,
            reference: receipt_id.clone(),
        };

        if let Err(e) = self.transfers.transfer(&request).await {
            warn!(
                "Payout of {} from bounty {} to {} failed: {}",
                amount, id, worker, e
            );
            return Err(LedgerError::TransferFailed(e.to_string()));
        }

        if let Err(e) = self.storage.save_bounty(&after) {
            error!(
                "Transfer {} of {} from bounty {} succeeded but the pool was not updated: {}",
                receipt_id, amount, id, e
            );
            return Err(e);
        }

        let receipt = PayoutReceipt {
            receipt_id,
            bounty_id: id.to_string(),
            worker: worker.clone(),
            percentage,
            amount,
            paid_by: caller.clone(),
            paid_at: Utc::now(),
        };
        // history is best-effort once value has moved
        if let Err(e) = self.storage.record_payout(&receipt) {
            error!("Failed to record payout {}: {}", receipt.receipt_id, e);
        }

        info!(
            "Paid {} ({}%) from bounty {} to {} (pool {} -> {})",
            amount, percentage, id, worker, before.pool, after.pool
        );
        Ok(receipt)
    }

    /// Current record, or the empty record (empty `id`) when none exists
    pub fn get_bounty_by_id(&self, id: &str) -> LedgerResult<Bounty> {
        debug!("Reading bounty {}", id);
        self.storage.load_bounty(id)
    }

    pub fn list_payouts(&self, id: &str) -> LedgerResult<Vec<PayoutReceipt>> {
        self.storage.list_payouts(id)
    }

    pub fn count_bounties(&self) -> LedgerResult<u64> {
        self.storage.count_bounties()
    }

    /// Bounty ids with a mutation running or queued
    pub fn active_locks(&self) -> usize {
        self.locks.len()
    }
}
