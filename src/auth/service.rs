/// Auth Service
///
/// The transport-agnostic operations exposed to collaborators: register,
/// authenticate, rotate, end a session, and check an access token.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::auth::claims::AccessClaims;
use crate::auth::jwt::TokenCodec;
use crate::auth::password::CredentialHasher;
use crate::auth::rotation::{RotationProtocol, TokenPair};
use crate::auth::session::SessionInvalidator;
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError};
use crate::store::{Account, AccountStore, Role, StoreError};
use crate::validators::email_key;

/// Public view of an account
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Account> for Profile {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            email: account.email.clone(),
            role: account.role,
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}

/// Result of a successful register or authenticate
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub tokens: TokenPair,
    pub profile: Profile,
}

#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn AccountStore>,
    codec: TokenCodec,
    hasher: CredentialHasher,
    invalidator: SessionInvalidator,
    rotation: RotationProtocol,
}

impl AuthService {
    pub fn new(store: Arc<dyn AccountStore>, jwt: JwtSettings, hasher: CredentialHasher) -> Self {
        let codec = TokenCodec::new(jwt);
        let invalidator = SessionInvalidator::new(store.clone());
        let rotation =
            RotationProtocol::new(store.clone(), codec.clone(), hasher, invalidator.clone());

        Self {
            store,
            codec,
            hasher,
            invalidator,
            rotation,
        }
    }

    pub fn access_token_expiry(&self) -> i64 {
        self.codec.access_token_expiry()
    }

    /// Create an account and open its first session (epoch 1).
    ///
    /// # Errors
    /// `EmailTaken` if the email is already registered; the existing
    /// account is left untouched.
    pub async fn register(&self, email: &str, password: &str) -> Result<AuthSession, AppError> {
        let email = email_key(email);
        if self.store.find_by_email(&email).await?.is_some() {
            return Err(AuthError::EmailTaken.into());
        }

        let account = Account::new(email, self.hasher.hash(password)?);
        self.store.insert(&account).await.map_err(|e| match e {
            StoreError::Duplicate(_) => AppError::Auth(AuthError::EmailTaken),
            other => other.into(),
        })?;

        let (tokens, account) = self.rotation.issue(account.id).await?;
        tracing::info!(account_id = %account.id, "Account registered");

        Ok(AuthSession {
            tokens,
            profile: Profile::from(&account),
        })
    }

    /// Check credentials and open a new session, invalidating every access
    /// token from earlier sessions.
    ///
    /// # Errors
    /// `InvalidCredentials` for an unknown email or a wrong password alike.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<AuthSession, AppError> {
        let account = self
            .store
            .find_by_email(&email_key(email))
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !self.hasher.verify(password, &account.password_hash) {
            return Err(AuthError::InvalidCredentials.into());
        }

        self.invalidator
            .on_login(account.id)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let (tokens, account) = self.rotation.issue(account.id).await?;
        tracing::info!(account_id = %account.id, epoch = account.session_epoch, "Account authenticated");

        Ok(AuthSession {
            tokens,
            profile: Profile::from(&account),
        })
    }

    /// Exchange a refresh token for a new pair. See `RotationProtocol::rotate`.
    pub async fn rotate(&self, refresh_token: &str) -> Result<TokenPair, AppError> {
        self.rotation.rotate(refresh_token).await
    }

    /// End every session of the account. Idempotent.
    pub async fn end_session(&self, account_id: Uuid) -> Result<(), AppError> {
        self.invalidator.on_logout(account_id).await
    }

    /// Verify an access token's signature and expiry only
    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, AuthError> {
        self.codec.verify_access(token)
    }

    /// Check that the claims were minted under the account's current epoch.
    ///
    /// Without this check, revocation only takes effect when the access
    /// token expires.
    pub async fn ensure_current(&self, claims: &AccessClaims) -> Result<(), AppError> {
        let account_id = claims.account_id()?;
        let account = self
            .store
            .find_by_id(account_id)
            .await?
            .ok_or(AuthError::TokenInvalid)?;

        if account.session_epoch != claims.epoch {
            tracing::debug!(
                account_id = %account_id,
                token_epoch = claims.epoch,
                current_epoch = account.session_epoch,
                "Access token from a previous session"
            );
            return Err(AuthError::TokenInvalid.into());
        }
        Ok(())
    }

    pub async fn profile(&self, account_id: Uuid) -> Result<Profile, AppError> {
        let account = self
            .store
            .find_by_id(account_id)
            .await?
            .ok_or(StoreError::NotFound(account_id))?;
        Ok(Profile::from(&account))
    }
}
