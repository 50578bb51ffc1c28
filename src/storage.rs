//! Durable ledger state backed by SQLite

use std::path::Path;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::info;

use crate::auth::Address;
use crate::bounty::{Bounty, PayoutReceipt};
use crate::error::{LedgerError, LedgerResult};

/// Ordered schema migrations; index + 1 is the resulting `user_version`
const MIGRATIONS: &[(&str, &str)] = &[
    (
        "001_ledger",
        r#"
        CREATE TABLE IF NOT EXISTS bounties (
            id TEXT PRIMARY KEY,
            pool TEXT NOT NULL,
            deadline TEXT NOT NULL,
            created_at TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS bounty_funders (
            bounty_id TEXT NOT NULL REFERENCES bounties(id),
            position INTEGER NOT NULL,
            address TEXT NOT NULL,
            PRIMARY KEY (bounty_id, address)
        );
        CREATE TABLE IF NOT EXISTS bounty_workers (
            bounty_id TEXT NOT NULL REFERENCES bounties(id),
            position INTEGER NOT NULL,
            address TEXT NOT NULL,
            PRIMARY KEY (bounty_id, address)
        );
        CREATE TABLE IF NOT EXISTS admins (
            address TEXT PRIMARY KEY,
            authorized INTEGER NOT NULL
        );
        CREATE TABLE IF NOT EXISTS ledger_meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );
        "#,
    ),
    (
        "002_payouts",
        r#"
        CREATE TABLE IF NOT EXISTS payouts (
            receipt_id TEXT PRIMARY KEY,
            bounty_id TEXT NOT NULL,
            worker TEXT NOT NULL,
            percentage INTEGER NOT NULL,
            amount TEXT NOT NULL,
            paid_by TEXT NOT NULL,
            paid_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_payouts_bounty ON payouts(bounty_id);
        "#,
    ),
];

pub struct LedgerStorage {
    conn: Mutex<Connection>,
}

impl LedgerStorage {
    pub fn new(path: impl AsRef<Path>) -> LedgerResult<Self> {
        let conn = Connection::open(path)?;
        let storage = Self {
            conn: Mutex::new(conn),
        };
        storage.run_migrations()?;
        Ok(storage)
    }

    pub fn in_memory() -> LedgerResult<Self> {
        let conn = Connection::open_in_memory()?;
        let storage = Self {
            conn: Mutex::new(conn),
        };
        storage.run_migrations()?;
        Ok(storage)
    }

    fn run_migrations(&self) -> LedgerResult<()> {
        let conn = self.conn.lock();
        let current: usize =
            conn.query_row("PRAGMA user_version", [], |row| row.get::<_, i64>(0))? as usize;

        for (version, (name, sql)) in MIGRATIONS.iter().enumerate().skip(current) {
            conn.execute_batch(sql)?;
            conn.pragma_update(None, "user_version", (version + 1) as i64)?;
            info!("Applied migration {}", name);
        }
        Ok(())
    }

    // ========================================================================
    // BOUNTIES
    // ========================================================================

    /// Current record for `id`, or the empty record if none was ever funded
    pub fn load_bounty(&self, id: &str) -> LedgerResult<Bounty> {
        let conn = self.conn.lock();

        let row: Option<(String, String)> = conn
            .query_row(
                "SELECT pool, deadline FROM bounties WHERE id = ?1",
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((pool, deadline)) = row else {
            return Ok(Bounty::default());
        };

        Ok(Bounty {
            id: id.to_string(),
            pool: parse_amount(&pool)?,
            funders: load_members(&conn, "bounty_funders", id)?,
            workers: load_members(&conn, "bounty_workers", id)?,
            deadline,
        })
    }

    /// Write the whole record in one transaction
    pub fn save_bounty(&self, bounty: &Bounty) -> LedgerResult<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO bounties (id, pool, deadline, created_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (id) DO UPDATE SET pool = excluded.pool",
            params![
                bounty.id,
                bounty.pool.to_string(),
                bounty.deadline,
                Utc::now().to_rfc3339()
            ],
        )?;

        for (table, members) in [
            ("bounty_funders", &bounty.funders),
            ("bounty_workers", &bounty.workers),
        ] {
            tx.execute(
                &format!("DELETE FROM {} WHERE bounty_id = ?1", table),
                params![bounty.id],
            )?;
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {} (bounty_id, position, address) VALUES (?1, ?2, ?3)",
                table
            ))?;
            for (position, address) in members.iter().enumerate() {
                stmt.execute(params![bounty.id, position as i64, address.as_str()])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    pub fn count_bounties(&self) -> LedgerResult<u64> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM bounties", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    // ========================================================================
    // PAYOUT HISTORY
    // ========================================================================

    pub fn record_payout(&self, receipt: &PayoutReceipt) -> LedgerResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO payouts (receipt_id, bounty_id, worker, percentage, amount, paid_by, paid_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                receipt.receipt_id,
                receipt.bounty_id,
                receipt.worker.as_str(),
                receipt.percentage,
                receipt.amount.to_string(),
                receipt.paid_by.as_str(),
                receipt.paid_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn list_payouts(&self, bounty_id: &str) -> LedgerResult<Vec<PayoutReceipt>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT receipt_id, worker, percentage, amount, paid_by, paid_at
             FROM payouts WHERE bounty_id = ?1 ORDER BY rowid ASC",
        )?;

        let rows = stmt
            .query_map(params![bounty_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, u32>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(receipt_id, worker, percentage, amount, paid_by, paid_at)| {
                Ok(PayoutReceipt {
                    receipt_id,
                    bounty_id: bounty_id.to_string(),
                    worker: parse_address(&worker)?,
                    percentage,
                    amount: parse_amount(&amount)?,
                    paid_by: parse_address(&paid_by)?,
                    paid_at: DateTime::parse_from_rfc3339(&paid_at)
                        .map_err(|e| LedgerError::Corrupt(format!("paid_at: {}", e)))?
                        .with_timezone(&Utc),
                })
            })
            .collect()
    }

    // ========================================================================
    // ADMINS
    // ========================================================================

    pub fn is_admin(&self, address: &Address) -> LedgerResult<bool> {
        let conn = self.conn.lock();
        let authorized: Option<bool> = conn
            .query_row(
                "SELECT authorized FROM admins WHERE address = ?1",
                params![address.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(authorized.unwrap_or(false))
    }

    pub fn set_admin(&self, address: &Address, authorized: bool) -> LedgerResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO admins (address, authorized) VALUES (?1, ?2)
             ON CONFLICT (address) DO UPDATE SET authorized = excluded.authorized",
            params![address.as_str(), authorized],
        )?;
        Ok(())
    }

    pub fn list_admins(&self) -> LedgerResult<Vec<Address>> {
        let conn = self.conn.lock();
        let mut stmt =
            conn.prepare("SELECT address FROM admins WHERE authorized = 1 ORDER BY address")?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        rows.iter().map(|a| parse_address(a)).collect()
    }

    // ========================================================================
    // META
    // ========================================================================

    pub fn get_meta(&self, key: &str) -> LedgerResult<Option<String>> {
        let conn = self.conn.lock();
        let value = conn
            .query_row(
                "SELECT value FROM ledger_meta WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn set_meta(&self, key: &str, value: &str) -> LedgerResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO ledger_meta (key, value) VALUES (?1, ?2)
             ON CONFLICT (key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }
}

fn load_members(conn: &Connection, table: &str, bounty_id: &str) -> LedgerResult<Vec<Address>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT address FROM {} WHERE bounty_id = ?1 ORDER BY position",
        table
    ))?;
    let rows = stmt
        .query_map(params![bounty_id], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    rows.iter().map(|a| parse_address(a)).collect()
}

fn parse_amount(raw: &str) -> LedgerResult<u128> {
    raw.parse()
        .map_err(|e| LedgerError::Corrupt(format!("amount '{}': {}", raw, e)))
}

fn parse_address(raw: &str) -> LedgerResult<Address> {
    Address::parse(raw).map_err(|_| LedgerError::Corrupt(format!("address '{}'", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> Address {
        Address::parse(&format!("0x{:040x}", n)).unwrap()
    }

    #[test]
    fn test_storage_in_memory() {
        let storage = LedgerStorage::in_memory().unwrap();
        let bounty = storage.load_bounty("missing").unwrap();
        assert_eq!(bounty, Bounty::default());
        assert_eq!(storage.count_bounties().unwrap(), 0);
    }

    #[test]
    fn test_save_and_load_bounty() {
        let storage = LedgerStorage::in_memory().unwrap();

        let mut bounty = Bounty::open("issue-1", "2026-12-31", 100, addr(1));
        bounty.deposit(50, addr(2)).unwrap();
        bounty.add_worker(addr(3)).unwrap();
        bounty.add_worker(addr(1)).unwrap();
        storage.save_bounty(&bounty).unwrap();

        let loaded = storage.load_bounty("issue-1").unwrap();
        assert_eq!(loaded, bounty);
        assert_eq!(loaded.workers, vec![addr(3), addr(1)]);
    }

    #[test]
    fn test_save_keeps_original_deadline_column() {
        let storage = LedgerStorage::in_memory().unwrap();
        let bounty = Bounty::open("issue-1", "d1", 100, addr(1));
        storage.save_bounty(&bounty).unwrap();

        let mut changed = bounty.clone();
        changed.deadline = "d2".to_string();
        changed.pool = 5;
        storage.save_bounty(&changed).unwrap();

        let loaded = storage.load_bounty("issue-1").unwrap();
        assert_eq!(loaded.deadline, "d1");
        assert_eq!(loaded.pool, 5);
    }

    #[test]
    fn test_large_pool_round_trips() {
        let storage = LedgerStorage::in_memory().unwrap();
        let bounty = Bounty::open("big", "", u128::MAX, addr(1));
        storage.save_bounty(&bounty).unwrap();
        assert_eq!(storage.load_bounty("big").unwrap().pool, u128::MAX);
    }

    #[test]
    fn test_admin_flags() {
        let storage = LedgerStorage::in_memory().unwrap();
        assert!(!storage.is_admin(&addr(1)).unwrap());

        storage.set_admin(&addr(1), true).unwrap();
        storage.set_admin(&addr(2), true).unwrap();
        storage.set_admin(&addr(2), false).unwrap();

        assert!(storage.is_admin(&addr(1)).unwrap());
        assert!(!storage.is_admin(&addr(2)).unwrap());
        assert_eq!(storage.list_admins().unwrap(), vec![addr(1)]);
    }

    #[test]
    fn test_meta() {
        let storage = LedgerStorage::in_memory().unwrap();
        assert_eq!(storage.get_meta("initializer").unwrap(), None);
        storage.set_meta("initializer", "a").unwrap();
        assert_eq!(storage.get_meta("initializer").unwrap().as_deref(), Some("a"));
    }

    #[test]
    fn test_payout_history_order() {
        let storage = LedgerStorage::in_memory().unwrap();
        let paid_at = Utc::now();
        for (i, amount) in [10_000u128, 5_000].into_iter().enumerate() {
            storage
                .record_payout(&PayoutReceipt {
                    receipt_id: format!("r{}", i),
                    bounty_id: "x".to_string(),
                    worker: addr(2),
                    percentage: 50,
                    amount,
                    paid_by: addr(1),
                    paid_at,
                })
                .unwrap();
        }

        let payouts = storage.list_payouts("x").unwrap();
        assert_eq!(payouts.len(), 2);
        assert_eq!(payouts[0].receipt_id, "r0");
        assert_eq!(payouts[1].amount, 5_000);
        assert!(storage.list_payouts("y").unwrap().is_empty());
    }

    #[test]
    fn test_state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.db");

        {
            let storage = LedgerStorage::new(&path).unwrap();
            storage
                .save_bounty(&Bounty::open("persisted", "d", 42, addr(1)))
                .unwrap();
            storage.set_admin(&addr(9), true).unwrap();
        }

        let storage = LedgerStorage::new(&path).unwrap();
        assert_eq!(storage.load_bounty("persisted").unwrap().pool, 42);
        assert!(storage.is_admin(&addr(9)).unwrap());
    }
}
