//! Revoked tokens repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};

use crate::error::AppResult;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RevokedTokensRepository: Send + Sync {
    async fn exists(&self, token: &str) -> AppResult<bool>;

    /// Insert unless the token is already present. Returns whether a row was added.
    async fn insert(&self, token: &str, user_id: i32, revoked_at: DateTime<Utc>) -> AppResult<bool>;

    /// Delete every entry owned by the user, returning how many went
    async fn delete_for_user(&self, user_id: i32) -> AppResult<u64>;

    async fn count_for_user(&self, user_id: i32) -> AppResult<i64>;
}

#[derive(Clone)]
pub struct PgRevokedTokensRepository {
    pool: Pool<Postgres>,
}

impl PgRevokedTokensRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RevokedTokensRepository for PgRevokedTokensRepository {
    async fn exists(&self, token: &str) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM revoked_tokens WHERE token = $1)")
            .bind(token)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn insert(&self, token: &str, user_id: i32, revoked_at: DateTime<Utc>) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO revoked_tokens (token, user_id, revoked_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (token) DO NOTHING
            "#,
        )
        .bind(token)
        .bind(user_id)
        .bind(revoked_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete_for_user(&self, user_id: i32) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM revoked_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn count_for_user(&self, user_id: i32) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM revoked_tokens WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
