//! Administrator registry
//!
//! Admins may pay out bounties and manage the admin set. Absence of an entry
//! means "not an admin".

use std::sync::Arc;

use tracing::{info, warn};

use crate::auth::Address;
use crate::error::{LedgerError, LedgerResult};
use crate::storage::LedgerStorage;

const INITIALIZER_KEY: &str = "initializer";

pub struct AdminRegistry {
    storage: Arc<LedgerStorage>,
}

impl AdminRegistry {
    /// Open the registry, authorizing `initializer` the first time this
    /// database is used. Later starts keep whatever the admins decided since.
    pub fn bootstrap(storage: Arc<LedgerStorage>, initializer: &Address) -> LedgerResult<Self> {
        match storage.get_meta(INITIALIZER_KEY)? {
            None => {
                storage.set_admin(initializer, true)?;
                storage.set_meta(INITIALIZER_KEY, initializer.as_str())?;
                info!("Initialized admin registry with {}", initializer);
            }
            Some(existing) if existing != initializer.as_str() => {
                warn!(
                    "Configured initializer {} ignored; registry was initialized by {}",
                    initializer, existing
                );
            }
            Some(_) => {}
        }
        Ok(Self { storage })
    }

    /// Identity that initialized this registry
    pub fn initializer(&self) -> LedgerResult<Option<Address>> {
        self.storage
            .get_meta(INITIALIZER_KEY)?
            .map(|raw| Address::parse(&raw))
            .transpose()
    }

    pub fn is_admin(&self, identity: &Address) -> LedgerResult<bool> {
        self.storage.is_admin(identity)
    }

    /// Fail with [`LedgerError::NotAdmin`] unless `caller` is authorized
    pub fn ensure_admin(&self, caller: &Address) -> LedgerResult<()> {
        if !self.is_admin(caller)? {
            warn!("Rejected privileged call from non-admin {}", caller);
            return Err(LedgerError::NotAdmin);
        }
        Ok(())
    }

    pub fn add_admin(&self, identity: &Address, caller: &Address) -> LedgerResult<()> {
        self.ensure_admin(caller)?;
        self.storage.set_admin(identity, true)?;
        info!("Admin {} added by {}", identity, caller);
        Ok(())
    }

    /// Removing the caller itself is allowed, and may leave no admins at all
    pub fn remove_admin(&self, identity: &Address, caller: &Address) -> LedgerResult<()> {
        self.ensure_admin(caller)?;
        self.storage.set_admin(identity, false)?;
        info!("Admin {} removed by {}", identity, caller);
        Ok(())
    }

    pub fn list_admins(&self) -> LedgerResult<Vec<Address>> {
        self.storage.list_admins()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> Address {
        Address::parse(&format!("0x{:040x}", n)).unwrap()
    }

    fn registry() -> AdminRegistry {
        let storage = Arc::new(LedgerStorage::in_memory().unwrap());
        AdminRegistry::bootstrap(storage, &addr(1)).unwrap()
    }

    #[test]
    fn test_initializer_is_admin() {
        let admins = registry();
        assert!(admins.is_admin(&addr(1)).unwrap());
        assert!(!admins.is_admin(&addr(2)).unwrap());
        assert_eq!(admins.initializer().unwrap(), Some(addr(1)));
    }

    #[test]
    fn test_add_and_remove() {
        let admins = registry();
        admins.add_admin(&addr(2), &addr(1)).unwrap();
        assert!(admins.is_admin(&addr(2)).unwrap());

        // new admin can manage the set too
        admins.remove_admin(&addr(1), &addr(2)).unwrap();
        assert!(!admins.is_admin(&addr(1)).unwrap());
        assert_eq!(admins.list_admins().unwrap(), vec![addr(2)]);
    }

    #[test]
    fn test_non_admin_cannot_manage() {
        let admins = registry();
        assert!(matches!(
            admins.add_admin(&addr(3), &addr(3)),
            Err(LedgerError::NotAdmin)
        ));
        assert!(matches!(
            admins.remove_admin(&addr(1), &addr(3)),
            Err(LedgerError::NotAdmin)
        ));
        assert!(!admins.is_admin(&addr(3)).unwrap());
        assert!(admins.is_admin(&addr(1)).unwrap());
    }

    #[test]
    fn test_idempotent_mutations() {
        let admins = registry();
        admins.add_admin(&addr(1), &addr(1)).unwrap();
        admins.remove_admin(&addr(5), &addr(1)).unwrap();
        assert_eq!(admins.list_admins().unwrap(), vec![addr(1)]);
    }

    #[test]
    fn test_bootstrap_runs_once() {
        let storage = Arc::new(LedgerStorage::in_memory().unwrap());
        let admins = AdminRegistry::bootstrap(storage.clone(), &addr(1)).unwrap();
        admins.add_admin(&addr(2), &addr(1)).unwrap();
        admins.remove_admin(&addr(1), &addr(2)).unwrap();

        // restart with the same and with a different initializer
        let admins = AdminRegistry::bootstrap(storage.clone(), &addr(1)).unwrap();
        assert!(!admins.is_admin(&addr(1)).unwrap());
        let admins = AdminRegistry::bootstrap(storage, &addr(7)).unwrap();
        assert!(!admins.is_admin(&addr(7)).unwrap());
        assert_eq!(admins.initializer().unwrap(), Some(addr(1)));
    }
}
