/// Rotation Protocol
///
/// Issues access/refresh pairs and exchanges a refresh token for a new
/// pair exactly once. Per account:
///
/// ```text
/// NoSession --issue--> Active --rotate--> Active' --rotate--> ...
///     ^                  |
///     |             reuse / lost race / logout
///     |                  v
///     +----login---- Terminated
/// ```
///
/// The stored fingerprint is replaced with a compare-and-set on the state
/// observed when the presented token was checked, so a refresh token can
/// win at most one rotation. Presenting a token that no longer matches is
/// treated as theft and tears the session down.

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::auth::jwt::TokenCodec;
use crate::auth::password::CredentialHasher;
use crate::auth::refresh_token::{fingerprint, matches_fingerprint};
use crate::auth::session::{SessionInvalidator, MAX_CAS_ATTEMPTS};
use crate::error::{AppError, AuthError};
use crate::store::{Account, AccountStore, SessionState, StoreError};

/// A freshly issued access/refresh pair
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Clone)]
pub struct RotationProtocol {
    store: Arc<dyn AccountStore>,
    codec: TokenCodec,
    hasher: CredentialHasher,
    invalidator: SessionInvalidator,
}

impl RotationProtocol {
    pub fn new(
        store: Arc<dyn AccountStore>,
        codec: TokenCodec,
        hasher: CredentialHasher,
        invalidator: SessionInvalidator,
    ) -> Self {
        Self {
            store,
            codec,
            hasher,
            invalidator,
        }
    }

    /// Issue a new pair for the account and make its refresh token the only
    /// one that matches the stored fingerprint.
    ///
    /// Returns the pair together with the account snapshot it was minted
    /// from.
    pub async fn issue(&self, account_id: Uuid) -> Result<(TokenPair, Account), AppError> {
        for _ in 0..MAX_CAS_ATTEMPTS {
            let account = self
                .store
                .find_by_id(account_id)
                .await?
                .ok_or(StoreError::NotFound(account_id))?;

            if let Some(pair) = self.issue_from(&account).await? {
                return Ok((pair, account));
            }
            tracing::debug!(account_id = %account_id, "Issue raced with another session update, retrying");
        }

        Err(StoreError::Backend(format!(
            "issuing tokens for {} did not settle after {} attempts",
            account_id, MAX_CAS_ATTEMPTS
        ))
        .into())
    }

    /// Exchange a refresh token for a new pair.
    ///
    /// # Errors
    /// - `InvalidRefresh`: bad signature, expired, or unknown subject
    /// - `SessionTerminated`: no active session, the token is not the latest
    ///   one issued, or a concurrent rotation won the race. In the last two
    ///   cases the session is torn down before returning.
    pub async fn rotate(&self, presented: &str) -> Result<TokenPair, AppError> {
        let claims = self.codec.verify_refresh(presented)?;
        let account_id = claims.account_id()?;

        let account = self
            .store
            .find_by_id(account_id)
            .await?
            .ok_or(AuthError::InvalidRefresh)?;

        let stored = match account.refresh_fingerprint.as_deref() {
            Some(stored) => stored,
            None => {
                tracing::info!(account_id = %account_id, "Refresh attempted without an active session");
                return Err(AuthError::SessionTerminated.into());
            }
        };

        if !matches_fingerprint(&self.hasher, presented, stored) {
            self.invalidator.on_theft_detected(account_id).await?;
            return Err(AuthError::SessionTerminated.into());
        }

        match self.issue_from(&account).await? {
            Some(pair) => {
                tracing::info!(account_id = %account_id, epoch = account.session_epoch, "Refresh token rotated");
                Ok(pair)
            }
            None => {
                tracing::warn!(account_id = %account_id, "Concurrent rotation of the same refresh token");
                self.invalidator.on_theft_detected(account_id).await?;
                Err(AuthError::SessionTerminated.into())
            }
        }
    }

    /// Sign a pair for `account` and store its fingerprint, conditioned on
    /// the session state in `account` still being current. `None` means the
    /// stored state moved on in between.
    async fn issue_from(&self, account: &Account) -> Result<Option<TokenPair>, AppError> {
        let access_token = self.codec.sign_access(account)?;
        let refresh_token = self.codec.sign_refresh(account.id)?;

        let next = SessionState {
            epoch: account.session_epoch,
            fingerprint: Some(fingerprint(&self.hasher, &refresh_token)?),
        };

        match self
            .store
            .compare_and_set_session(account.id, &account.session_state(), &next)
            .await
        {
            Ok(true) => Ok(Some(TokenPair {
                access_token,
                refresh_token,
            })),
            Ok(false) | Err(StoreError::NotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
