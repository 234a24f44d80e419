/// In-memory account store
///
/// Keeps accounts in a mutex-guarded map. Every operation holds the lock
/// for its whole read-modify-write, so `compare_and_set_session` is atomic.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::{Account, AccountStore, SessionState, StoreError};

#[derive(Default)]
pub struct InMemoryAccountStore {
    accounts: Mutex<HashMap<Uuid, Account>>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<Uuid, Account>>, StoreError> {
        self.accounts
            .lock()
            .map_err(|_| StoreError::Backend("account map lock poisoned".to_string()))
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let accounts = self.lock()?;
        Ok(accounts.values().find(|a| a.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        let accounts = self.lock()?;
        Ok(accounts.get(&id).cloned())
    }

    async fn insert(&self, account: &Account) -> Result<(), StoreError> {
        let mut accounts = self.lock()?;
        if accounts.values().any(|a| a.email == account.email) {
            return Err(StoreError::Duplicate(account.email.clone()));
        }
        accounts.insert(account.id, account.clone());
        Ok(())
    }

    async fn compare_and_set_session(
        &self,
        id: Uuid,
        expected: &SessionState,
        next: &SessionState,
    ) -> Result<bool, StoreError> {
        let mut accounts = self.lock()?;
        let account = accounts.get_mut(&id).ok_or(StoreError::NotFound(id))?;

        if account.session_state() != *expected {
            return Ok(false);
        }

        account.session_epoch = next.epoch;
        account.refresh_fingerprint = next.fingerprint.clone();
        account.updated_at = Utc::now();
        Ok(true)
    }
}
