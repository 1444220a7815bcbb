//! Verification record store backed by `PostgreSQL`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use doorstep_core::{PhoneNumber, VerificationId};
use sqlx::PgPool;

use super::{RepositoryError, VerificationStore};
use crate::models::VerificationRecord;

/// Postgres-backed [`VerificationStore`].
#[derive(Clone)]
pub struct PgVerificationStore {
    pool: PgPool,
}

impl PgVerificationStore {
    /// Create a new verification store over a connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct VerificationRow {
    id: VerificationId,
    phone_number: PhoneNumber,
    code: String,
    expires_at: DateTime<Utc>,
    verified: bool,
    attempts: i32,
    created_at: DateTime<Utc>,
}

impl From<VerificationRow> for VerificationRecord {
    fn from(row: VerificationRow) -> Self {
        Self {
            id: row.id,
            phone_number: row.phone_number,
            code: row.code,
            expires_at: row.expires_at,
            verified: row.verified,
            attempts: row.attempts,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl VerificationStore for PgVerificationStore {
    async fn latest_unverified(
        &self,
        phone: &PhoneNumber,
    ) -> Result<Option<VerificationRecord>, RepositoryError> {
        let row = sqlx::query_as::<_, VerificationRow>(
            r"
            SELECT id, phone_number, code, expires_at, verified, attempts, created_at
            FROM verifications
            WHERE phone_number = $1 AND NOT verified
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            ",
        )
        .bind(phone.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(VerificationRecord::from))
    }

    async fn delete_unverified(&self, phone: &PhoneNumber) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            DELETE FROM verifications
            WHERE phone_number = $1 AND NOT verified
            ",
        )
        .bind(phone.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn insert(
        &self,
        phone: &PhoneNumber,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<VerificationRecord, RepositoryError> {
        let row = sqlx::query_as::<_, VerificationRow>(
            r"
            INSERT INTO verifications (phone_number, code, expires_at)
            VALUES ($1, $2, $3)
            RETURNING id, phone_number, code, expires_at, verified, attempts, created_at
            ",
        )
        .bind(phone.as_str())
        .bind(code)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn increment_attempts(&self, id: VerificationId) -> Result<i32, RepositoryError> {
        let attempts = sqlx::query_scalar::<_, i32>(
            r"
            UPDATE verifications
            SET attempts = attempts + 1
            WHERE id = $1
            RETURNING attempts
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        attempts.ok_or(RepositoryError::NotFound)
    }

    async fn mark_verified(&self, id: VerificationId) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE verifications
            SET verified = TRUE
            WHERE id = $1
            ",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn delete(&self, id: VerificationId) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            DELETE FROM verifications
            WHERE id = $1
            ",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
