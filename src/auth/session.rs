/// Session Invalidator
///
/// Epoch bumps and fingerprint clears for login, logout and theft response.
/// These transitions are unconditional, so each one retries its
/// compare-and-set until it lands on a fresh read.

use std::sync::Arc;

use uuid::Uuid;

use crate::error::AppError;
use crate::store::{Account, AccountStore, SessionState, StoreError};

pub(crate) const MAX_CAS_ATTEMPTS: usize = 16;

/// Apply `next_state` to the account's current session state as one atomic
/// read-modify-write.
///
/// `next_state` returning `None` means no change is needed. Returns the
/// account as it looks after the transition, or `None` if it does not exist.
pub(crate) async fn update_session<F>(
    store: &dyn AccountStore,
    account_id: Uuid,
    next_state: F,
) -> Result<Option<Account>, AppError>
where
    F: Fn(&Account) -> Result<Option<SessionState>, AppError>,
{
    for _ in 0..MAX_CAS_ATTEMPTS {
        let mut account = match store.find_by_id(account_id).await? {
            Some(account) => account,
            None => return Ok(None),
        };

        let next = match next_state(&account)? {
            Some(next) => next,
            None => return Ok(Some(account)),
        };

        match store
            .compare_and_set_session(account_id, &account.session_state(), &next)
            .await
        {
            Ok(true) => {
                account.session_epoch = next.epoch;
                account.refresh_fingerprint = next.fingerprint;
                return Ok(Some(account));
            }
            Ok(false) => {
                tracing::debug!(account_id = %account_id, "Session update raced, retrying");
            }
            Err(StoreError::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e.into()),
        }
    }

    Err(StoreError::Backend(format!(
        "session update for {} did not settle after {} attempts",
        account_id, MAX_CAS_ATTEMPTS
    ))
    .into())
}

#[derive(Clone)]
pub struct SessionInvalidator {
    store: Arc<dyn AccountStore>,
}

impl SessionInvalidator {
    pub fn new(store: Arc<dyn AccountStore>) -> Self {
        Self { store }
    }

    /// Bump the epoch ahead of issuing a new pair, invalidating every access
    /// token from earlier sessions.
    pub async fn on_login(&self, account_id: Uuid) -> Result<Option<Account>, AppError> {
        let account = update_session(self.store.as_ref(), account_id, |account| {
            Ok(Some(SessionState {
                epoch: account.session_epoch + 1,
                fingerprint: account.refresh_fingerprint.clone(),
            }))
        })
        .await?;

        if let Some(account) = &account {
            tracing::info!(account_id = %account_id, epoch = account.session_epoch, "Session epoch advanced for login");
        }
        Ok(account)
    }

    /// Clear the refresh fingerprint and bump the epoch.
    ///
    /// Idempotent: an account with no active session is left untouched.
    pub async fn on_logout(&self, account_id: Uuid) -> Result<(), AppError> {
        let account = self.terminate(account_id).await?;
        tracing::info!(
            account_id = %account_id,
            epoch = ?account.map(|a| a.session_epoch),
            "Session ended"
        );
        Ok(())
    }

    /// Same teardown as logout, triggered by refresh-token reuse
    pub async fn on_theft_detected(&self, account_id: Uuid) -> Result<(), AppError> {
        let account = self.terminate(account_id).await?;
        tracing::warn!(
            account_id = %account_id,
            epoch = ?account.map(|a| a.session_epoch),
            "Refresh token reuse detected, session torn down"
        );
        Ok(())
    }

    async fn terminate(&self, account_id: Uuid) -> Result<Option<Account>, AppError> {
        update_session(self.store.as_ref(), account_id, |account| {
            if !account.has_active_session() {
                return Ok(None);
            }
            Ok(Some(SessionState {
                epoch: account.session_epoch + 1,
                fingerprint: None,
            }))
        })
        .await
    }
}
