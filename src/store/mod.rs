/// Account Store
///
/// Durable keyed storage for account records. The session core depends
/// only on the `AccountStore` trait; concrete backends live in the
/// submodules.

mod memory;
mod postgres;

pub use memory::InMemoryAccountStore;
pub use postgres::PgAccountStore;

use std::error::Error as StdError;
use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Epoch assigned to freshly registered accounts
pub const INITIAL_EPOCH: i64 = 1;

/// Authorization tag carried in access-token claims
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(StoreError::Backend(format!("unknown role '{}'", other))),
        }
    }
}

/// The pair of fields guarded by the conditional update.
///
/// `fingerprint == None` means the account has no active session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub epoch: i64,
    pub fingerprint: Option<String>,
}

/// Identity record
#[derive(Debug, Clone)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub session_epoch: i64,
    pub refresh_fingerprint: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Build a new account with no active session
    pub fn new(email: String, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email,
            password_hash,
            role: Role::default(),
            session_epoch: INITIAL_EPOCH,
            refresh_fingerprint: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn session_state(&self) -> SessionState {
        SessionState {
            epoch: self.session_epoch,
            fingerprint: self.refresh_fingerprint.clone(),
        }
    }

    pub fn has_active_session(&self) -> bool {
        self.refresh_fingerprint.is_some()
    }
}

/// Storage backend errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// An account with the same email already exists
    Duplicate(String),
    NotFound(Uuid),
    /// Backend unreachable or timed out
    Unavailable(String),
    Backend(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Duplicate(email) => write!(f, "Account already exists: {}", email),
            StoreError::NotFound(id) => write!(f, "Account not found: {}", id),
            StoreError::Unavailable(msg) => write!(f, "Account store unavailable: {}", msg),
            StoreError::Backend(msg) => write!(f, "Account store error: {}", msg),
        }
    }
}

impl StdError for StoreError {}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
                StoreError::Duplicate(db.message().to_string())
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::Unavailable(err.to_string())
            }
            _ => StoreError::Backend(err.to_string()),
        }
    }
}

/// Keyed account storage with an atomic conditional session update.
///
/// Implementations must be safe to share between concurrently running
/// requests.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError>;

    /// Insert a new account.
    ///
    /// # Errors
    /// Returns `StoreError::Duplicate` if the email is already registered.
    async fn insert(&self, account: &Account) -> Result<(), StoreError>;

    /// Replace the session state of `id` with `next`, but only if the stored
    /// state still equals `expected`.
    ///
    /// Returns `Ok(false)` when the stored state has moved on, and
    /// `StoreError::NotFound` when the account does not exist.
    async fn compare_and_set_session(
        &self,
        id: Uuid,
        expected: &SessionState,
        next: &SessionState,
    ) -> Result<bool, StoreError>;
}
