/// JWT Claims structures
///
/// Access claims carry the authorization snapshot (email, role, epoch).
/// Refresh claims carry only the subject, so role or epoch changes take
/// effect without re-issuing refresh tokens.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AuthError;
use crate::store::Role;

/// Claims for short-lived access tokens
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct AccessClaims {
    /// Subject (account ID as UUID string)
    pub sub: String,
    pub email: String,
    pub role: Role,
    /// Session epoch the token was minted under
    pub epoch: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    pub iss: String,
}

impl AccessClaims {
    pub fn new(
        account_id: Uuid,
        email: String,
        role: Role,
        epoch: i64,
        expiry_seconds: i64,
        issuer: String,
    ) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub: account_id.to_string(),
            email,
            role,
            epoch,
            exp: now + expiry_seconds,
            iat: now,
            iss: issuer,
        }
    }

    /// Extract account ID from claims
    pub fn account_id(&self) -> Result<Uuid, AuthError> {
        Uuid::parse_str(&self.sub).map_err(|_| AuthError::TokenInvalid)
    }
}

/// Claims for long-lived refresh tokens
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct RefreshClaims {
    pub sub: String,
    /// Random token ID; keeps two tokens minted in the same second distinct
    pub jti: String,
    pub exp: i64,
    pub iat: i64,
    pub iss: String,
}

impl RefreshClaims {
    pub fn new(account_id: Uuid, expiry_seconds: i64, issuer: String) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub: account_id.to_string(),
            jti: Uuid::new_v4().to_string(),
            exp: now + expiry_seconds,
            iat: now,
            iss: issuer,
        }
    }

    pub fn account_id(&self) -> Result<Uuid, AuthError> {
        Uuid::parse_str(&self.sub).map_err(|_| AuthError::InvalidRefresh)
    }
}
