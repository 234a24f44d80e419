/// Credential Hasher
///
/// Salted, computationally expensive one-way hashing with bcrypt. Used for
/// account passwords directly and for refresh-token fingerprints after a
/// SHA-256 pre-hash (see `refresh_token`).

use bcrypt::{hash, verify, DEFAULT_COST};

use crate::error::AppError;

/// bcrypt ignores input past this many bytes
pub const MAX_SECRET_BYTES: usize = 72;

#[derive(Debug, Clone, Copy)]
pub struct CredentialHasher {
    cost: u32,
}

impl Default for CredentialHasher {
    fn default() -> Self {
        Self { cost: DEFAULT_COST }
    }
}

impl CredentialHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    /// Hash a secret with a fresh random salt
    ///
    /// # Errors
    /// Returns error if the configured cost is out of range
    pub fn hash(&self, secret: &str) -> Result<String, AppError> {
        hash(secret, self.cost)
            .map_err(|e| AppError::Internal(format!("Secret hashing failed: {}", e)))
    }

    /// Check a secret against a digest produced by `hash`.
    ///
    /// Never fails: a mismatch or an unparseable digest is `false`.
    pub fn verify(&self, secret: &str, digest: &str) -> bool {
        match verify(secret, digest) {
            Ok(valid) => valid,
            Err(e) => {
                tracing::warn!("Stored digest could not be verified: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> CredentialHasher {
        CredentialHasher::new(4)
    }

    #[test]
    fn test_hash_password() {
        let password = "pw123456";
        let digest = hasher().hash(password).expect("Failed to hash password");

        assert_ne!(password, digest);
        assert!(digest.starts_with("$2"));
    }

    #[test]
    fn test_verify_password() {
        let digest = hasher().hash("pw123456").expect("Failed to hash password");
        assert!(hasher().verify("pw123456", &digest));
    }

    #[test]
    fn test_verify_wrong_password() {
        let digest = hasher().hash("pw123456").expect("Failed to hash password");
        assert!(!hasher().verify("pw654321", &digest));
    }

    #[test]
    fn test_salt_differs_per_call() {
        let first = hasher().hash("pw123456").unwrap();
        let second = hasher().hash("pw123456").unwrap();

        assert_ne!(first, second);
        assert!(hasher().verify("pw123456", &first));
        assert!(hasher().verify("pw123456", &second));
    }

    #[test]
    fn test_malformed_digest_is_mismatch() {
        assert!(!hasher().verify("pw123456", "not-a-bcrypt-digest"));
    }

    #[test]
    fn test_invalid_cost_is_error() {
        assert!(CredentialHasher::new(99).hash("pw123456").is_err());
    }
}
