/// Refresh Token Fingerprints
///
/// Only a fingerprint of the current refresh token is ever stored. A signed
/// token is longer than bcrypt's 72-byte input ceiling, so it is first
/// reduced with SHA-256 to a fixed 64-char hex digest, and that digest is
/// what gets salted and hashed.

use sha2::{Digest, Sha256};

use crate::auth::password::CredentialHasher;
use crate::error::AppError;

/// Reduce a refresh token to a fixed-length digest
fn prehash(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Produce the stored fingerprint for a refresh token
pub fn fingerprint(hasher: &CredentialHasher, token: &str) -> Result<String, AppError> {
    hasher.hash(&prehash(token))
}

/// Check a presented refresh token against a stored fingerprint
pub fn matches_fingerprint(hasher: &CredentialHasher, token: &str, fingerprint: &str) -> bool {
    hasher.verify(&prehash(token), fingerprint)
}
