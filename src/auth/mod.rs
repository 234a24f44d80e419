/// Authentication module
///
/// Credential hashing, token signing, refresh-token rotation with reuse
/// detection, and session invalidation.

mod claims;
mod jwt;
mod password;
mod refresh_token;
mod rotation;
mod service;
mod session;

pub use claims::{AccessClaims, RefreshClaims};
pub use jwt::TokenCodec;
pub use password::{CredentialHasher, MAX_SECRET_BYTES};
pub use refresh_token::{fingerprint, matches_fingerprint};
pub use rotation::{RotationProtocol, TokenPair};
pub use service::{AuthService, AuthSession, Profile};
pub use session::SessionInvalidator;
