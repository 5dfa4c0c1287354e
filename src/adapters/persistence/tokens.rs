//! `tokens` table: refresh token hashes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use super::{PgStore, classify};
use crate::domain::StoreError;
use crate::ports::token_store::{StoredRefreshToken, TokenStore};

#[async_trait]
impl TokenStore for PgStore {
    async fn insert(&self, token: &StoredRefreshToken) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO tokens (id, user_id, token_hash, expires_at, revoked) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(token.id)
        .bind(token.user_id)
        .bind(&token.secret_hash)
        .bind(token.expires_at)
        .bind(token.revoked)
        .execute(&self.pool)
        .await
        .map_err(|e| classify(e, "refresh token"))?;
        Ok(())
    }

    async fn active_for_user(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<StoredRefreshToken>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, user_id, token_hash, expires_at, revoked FROM tokens \
             WHERE user_id = $1 AND revoked = FALSE AND expires_at > $2",
        )
        .bind(user_id)
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| classify(e, "refresh token"))?;

        rows.iter()
            .map(|row| {
                Ok(StoredRefreshToken {
                    id: row.try_get("id")?,
                    user_id: row.try_get("user_id")?,
                    secret_hash: row.try_get("token_hash")?,
                    expires_at: row.try_get("expires_at")?,
                    revoked: row.try_get("revoked")?,
                })
            })
            .collect::<Result<_, sqlx::Error>>()
            .map_err(StoreError::backend)
    }

    async fn revoke(&self, token_id: Uuid) -> Result<bool, StoreError> {
        let done = sqlx::query("UPDATE tokens SET revoked = TRUE WHERE id = $1 AND revoked = FALSE")
            .bind(token_id)
            .execute(&self.pool)
            .await
            .map_err(|e| classify(e, "refresh token"))?;
        Ok(done.rows_affected() == 1)
    }
}
