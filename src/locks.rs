//! Per-bounty mutual exclusion
//!
//! Mutations on one bounty id run one at a time; different ids never wait on
//! each other. The guard is async because a payout holds it across the
//! external transfer. A slot lives only while someone holds or waits on it.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

#[derive(Default)]
pub struct IdLocks {
    slots: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

/// Exclusive access to one id; frees the slot on drop when nobody else wants it
pub struct IdGuard<'a> {
    locks: &'a IdLocks,
    id: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl IdLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `id`
    pub async fn acquire(&self, id: &str) -> IdGuard<'_> {
        let slot = {
            let mut slots = self.slots.lock();
            slots
                .entry(id.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        IdGuard {
            locks: self,
            id: id.to_string(),
            guard: Some(slot.lock_owned().await),
        }
    }

    /// Number of ids currently held or waited on
    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for IdGuard<'_> {
    fn drop(&mut self) {
        let mut slots = self.locks.slots.lock();
        if let Some(guard) = self.guard.take() {
            // one reference in the map, one in this guard: no waiters
            if Arc::strong_count(OwnedMutexGuard::mutex(&guard)) == 2 {
                slots.remove(&self.id);
            }
            drop(guard);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_id_is_exclusive() {
        let locks = IdLocks::new();
        let guard = locks.acquire("a").await;

        let second = tokio::time::timeout(Duration::from_millis(50), locks.acquire("a")).await;
        assert!(second.is_err());

        drop(guard);
        let third = tokio::time::timeout(Duration::from_millis(50), locks.acquire("a")).await;
        assert!(third.is_ok());
    }

    #[tokio::test]
    async fn test_different_ids_are_independent() {
        let locks = IdLocks::new();
        let _a = locks.acquire("a").await;
        let b = tokio::time::timeout(Duration::from_millis(50), locks.acquire("b")).await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn test_slots_released_after_use() {
        let locks = IdLocks::new();
        for i in 0..100 {
            let _guard = locks.acquire(&format!("id-{}", i)).await;
            assert_eq!(locks.len(), 1);
        }
        assert!(locks.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_slot_kept_while_waiters_remain() {
        let locks = Arc::new(IdLocks::new());
        let first = locks.acquire("a").await;

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire("a").await;
                locks.len()
            })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        drop(first);

        // the waiter took over the same slot instead of a fresh one
        assert_eq!(waiter.await.unwrap(), 1);
        assert!(locks.is_empty());
    }
}
