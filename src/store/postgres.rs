/// Postgres account store
///
/// The conditional session update is a single `UPDATE ... WHERE` statement,
/// so concurrent writers are serialized by the row lock and only the first
/// one whose expectation still holds affects a row.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{Account, AccountStore, SessionState, StoreError};

type AccountRow = (
    Uuid,
    String,
    String,
    String,
    i64,
    Option<String>,
    DateTime<Utc>,
    DateTime<Utc>,
);

const SELECT_ACCOUNT: &str = r#"
    SELECT id, email, password_hash, role, session_epoch, refresh_fingerprint, created_at, updated_at
    FROM accounts
"#;

#[derive(Clone)]
pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn into_account(row: AccountRow) -> Result<Account, StoreError> {
    let (id, email, password_hash, role, session_epoch, refresh_fingerprint, created_at, updated_at) =
        row;
    Ok(Account {
        id,
        email,
        password_hash,
        role: role.parse()?,
        session_epoch,
        refresh_fingerprint,
        created_at,
        updated_at,
    })
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        sqlx::query_as::<_, AccountRow>(&format!("{} WHERE email = $1", SELECT_ACCOUNT))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?
            .map(into_account)
            .transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        sqlx::query_as::<_, AccountRow>(&format!("{} WHERE id = $1", SELECT_ACCOUNT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(into_account)
            .transpose()
    }

    async fn insert(&self, account: &Account) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO accounts
                (id, email, password_hash, role, session_epoch, refresh_fingerprint, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(account.id)
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(account.role.as_str())
        .bind(account.session_epoch)
        .bind(&account.refresh_fingerprint)
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match StoreError::from(e) {
            StoreError::Duplicate(_) => StoreError::Duplicate(account.email.clone()),
            other => other,
        })?;

        Ok(())
    }

    async fn compare_and_set_session(
        &self,
        id: Uuid,
        expected: &SessionState,
        next: &SessionState,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET session_epoch = $4, refresh_fingerprint = $5, updated_at = $6
            WHERE id = $1
              AND session_epoch = $2
              AND refresh_fingerprint IS NOT DISTINCT FROM $3
            "#,
        )
        .bind(id)
        .bind(expected.epoch)
        .bind(&expected.fingerprint)
        .bind(next.epoch)
        .bind(&next.fingerprint)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(true);
        }

        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM accounts WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        if exists {
            Ok(false)
        } else {
            Err(StoreError::NotFound(id))
        }
    }
}
