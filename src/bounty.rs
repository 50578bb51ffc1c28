//! Bounty records and payout arithmetic

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::Address;
use crate::error::{LedgerError, LedgerResult};

/// Granularity the pool is truncated to before a percentage is applied
pub const PAYOUT_UNIT: u128 = 10_000;

/// Largest accepted payout percentage
pub const MAX_PERCENTAGE: u32 = 100;

/// An escrow pool keyed by an issue identifier.
///
/// The default value is the "no such bounty" record: empty `id`, zero pool,
/// no funders or workers. An empty `id` is how callers detect a miss.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounty {
    pub id: String,
    #[serde(with = "amount_string")]
    pub pool: u128,
    pub funders: Vec<Address>,
    pub workers: Vec<Address>,
    pub deadline: String,
}

impl Bounty {
    /// Record created by the first deposit under `id`
    pub fn open(id: &str, deadline: &str, value: u128, funder: Address) -> Self {
        Self {
            id: id.to_string(),
            pool: value,
            funders: vec![funder],
            workers: Vec::new(),
            deadline: deadline.to_string(),
        }
    }

    pub fn exists(&self) -> bool {
        !self.id.is_empty()
    }

    /// Merge a further deposit. The stored deadline is never touched.
    pub fn deposit(&mut self, value: u128, funder: Address) -> LedgerResult<()> {
        self.pool = self
            .pool
            .checked_add(value)
            .ok_or(LedgerError::PoolOverflow)?;
        if !self.funders.contains(&funder) {
            self.funders.push(funder);
        }
        Ok(())
    }

    pub fn add_worker(&mut self, worker: Address) -> LedgerResult<()> {
        if self.workers.contains(&worker) {
            return Err(LedgerError::AlreadyWorking);
        }
        self.workers.push(worker);
        Ok(())
    }

    /// Remove `amount` from the pool, failing instead of wrapping
    pub fn withdraw(&mut self, amount: u128) -> LedgerResult<()> {
        self.pool = self
            .pool
            .checked_sub(amount)
            .ok_or(LedgerError::PoolUnderflow)?;
        Ok(())
    }
}

/// Amount released for `percentage` of `pool`.
///
/// The pool is first truncated to a multiple of [`PAYOUT_UNIT`], then scaled:
/// `floor(pool / 10000) * (percentage * 100)`. Pools under 10000 always pay 0
/// and the `pool % 10000` remainder is never paid. Callers validate the
/// percentage beforehand.
pub fn payout_amount(pool: u128, percentage: u32) -> u128 {
    (pool / PAYOUT_UNIT) * (u128::from(percentage) * 100)
}

pub fn validate_percentage(percentage: u32) -> LedgerResult<()> {
    if percentage > MAX_PERCENTAGE {
        return Err(LedgerError::InvalidPercentage(percentage));
    }
    Ok(())
}

/// A completed payout, kept as history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutReceipt {
    pub receipt_id: String,
    pub bounty_id: String,
    pub worker: Address,
    pub percentage: u32,
    #[serde(with = "amount_string")]
    pub amount: u128,
    pub paid_by: Address,
    pub paid_at: DateTime<Utc>,
}

/// u128 amounts travel as decimal strings so JSON consumers never lose precision
pub mod amount_string {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(u64),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Text(s) => s.trim().parse().map_err(de::Error::custom),
            Raw::Number(n) => Ok(u128::from(n)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> Address {
        Address::parse(&format!("0x{:040x}", n)).unwrap()
    }

    #[test]
    fn test_default_is_missing() {
        let bounty = Bounty::default();
        assert!(!bounty.exists());
        assert_eq!(bounty.pool, 0);
        assert!(bounty.funders.is_empty());
        assert!(bounty.workers.is_empty());
    }

    #[test]
    fn test_payout_truncates_pool() {
        // floor(9999 / 10000) = 0
        assert_eq!(payout_amount(9_999, 50), 0);
        assert_eq!(payout_amount(9_999, 100), 0);
        assert_eq!(payout_amount(20_000, 50), 10_000);
        // remainder of 5000 is never released
        assert_eq!(payout_amount(25_000, 100), 20_000);
        assert_eq!(payout_amount(1_000_000, 0), 0);
    }

    #[test]
    fn test_payout_never_exceeds_pool() {
        for pool in [0u128, 1, 9_999, 10_000, 10_001, 123_456_789, u128::MAX] {
            for pct in 0..=MAX_PERCENTAGE {
                assert!(payout_amount(pool, pct) <= pool);
            }
        }
    }

    #[test]
    fn test_validate_percentage() {
        assert!(validate_percentage(0).is_ok());
        assert!(validate_percentage(100).is_ok());
        assert!(matches!(
            validate_percentage(101),
            Err(LedgerError::InvalidPercentage(101))
        ));
    }

    #[test]
    fn test_deposit_keeps_first_deadline_and_unique_funders() {
        let mut bounty = Bounty::open("x", "d1", 100, addr(1));
        bounty.deposit(50, addr(2)).unwrap();
        bounty.deposit(25, addr(1)).unwrap();
        assert_eq!(bounty.pool, 175);
        assert_eq!(bounty.funders, vec![addr(1), addr(2)]);
        assert_eq!(bounty.deadline, "d1");
    }

    #[test]
    fn test_deposit_overflow() {
        let mut bounty = Bounty::open("x", "", u128::MAX, addr(1));
        assert!(matches!(
            bounty.deposit(1, addr(1)),
            Err(LedgerError::PoolOverflow)
        ));
        assert_eq!(bounty.pool, u128::MAX);
    }

    #[test]
    fn test_withdraw_underflow() {
        let mut bounty = Bounty::open("x", "", 10, addr(1));
        assert!(matches!(bounty.withdraw(11), Err(LedgerError::PoolUnderflow)));
        bounty.withdraw(10).unwrap();
        assert_eq!(bounty.pool, 0);
    }

    #[test]
    fn test_add_worker_rejects_duplicate() {
        let mut bounty = Bounty::open("x", "", 10, addr(1));
        bounty.add_worker(addr(1)).unwrap();
        assert!(matches!(
            bounty.add_worker(addr(1)),
            Err(LedgerError::AlreadyWorking)
        ));
        assert_eq!(bounty.workers.len(), 1);
    }

    #[test]
    fn test_pool_serializes_as_string() {
        let bounty = Bounty::open("x", "d", 340_282_366_920_938_463_463_374_607_431_768_211_455, addr(1));
        let json = serde_json::to_value(&bounty).unwrap();
        assert_eq!(json["pool"], "340282366920938463463374607431768211455");
        let back: Bounty = serde_json::from_value(json).unwrap();
        assert_eq!(back, bounty);
    }
}
