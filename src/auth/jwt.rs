/// Token Codec
///
/// Signs and verifies access and refresh tokens under separate secrets and
/// separate expiries. Pure and stateless: verification never touches the
/// account store.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::auth::claims::{AccessClaims, RefreshClaims};
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError};
use crate::store::Account;

#[derive(Clone)]
pub struct TokenCodec {
    config: JwtSettings,
}

impl TokenCodec {
    pub fn new(config: JwtSettings) -> Self {
        Self { config }
    }

    pub fn access_token_expiry(&self) -> i64 {
        self.config.access_token_expiry
    }

    /// Sign an access token carrying the account's current authorization
    /// snapshot
    pub fn sign_access(&self, account: &Account) -> Result<String, AppError> {
        let claims = AccessClaims::new(
            account.id,
            account.email.clone(),
            account.role,
            account.session_epoch,
            self.config.access_token_expiry,
            self.config.issuer.clone(),
        );
        sign(&claims, &self.config.access_secret)
    }

    /// Sign a refresh token carrying only the subject
    pub fn sign_refresh(&self, account_id: Uuid) -> Result<String, AppError> {
        let claims = RefreshClaims::new(
            account_id,
            self.config.refresh_token_expiry,
            self.config.issuer.clone(),
        );
        sign(&claims, &self.config.refresh_secret)
    }

    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, AuthError> {
        verify(token, &self.config.access_secret, &self.config.issuer)
            .map_err(|_| AuthError::TokenInvalid)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<RefreshClaims, AuthError> {
        verify(token, &self.config.refresh_secret, &self.config.issuer)
            .map_err(|_| AuthError::InvalidRefresh)
    }
}

fn sign<T: serde::Serialize>(claims: &T, secret: &str) -> Result<String, AppError> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
}

fn verify<T: DeserializeOwned>(
    token: &str,
    secret: &str,
    issuer: &str,
) -> Result<T, jsonwebtoken::errors::Error> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[issuer]);
    validation.leeway = 0;

    decode::<T>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!("JWT validation error: {}", e);
            e
        })
}
