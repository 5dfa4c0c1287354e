//! `users` and `wallets` tables.

use async_trait::async_trait;
use sqlx::Row;
use sqlx::postgres::PgRow;
use uuid::Uuid;

use super::{PgStore, classify};
use crate::domain::StoreError;
use crate::domain::identity::{
    AuthProvider, NewCredentialUser, OAuthProfile, User, UserWithSecret,
};
use crate::domain::market::Wallet;
use crate::ports::repository::{UserRepository, WalletRepository};

const USER_COLUMNS: &str = "id, type, name, email, verified, profile, provider";

fn user_from_row(row: &PgRow) -> Result<User, StoreError> {
    let provider: String = row.try_get("provider").map_err(StoreError::backend)?;
    Ok(User {
        id: row.try_get("id").map_err(StoreError::backend)?,
        kind: row.try_get("type").map_err(StoreError::backend)?,
        name: row.try_get("name").map_err(StoreError::backend)?,
        email: row.try_get("email").map_err(StoreError::backend)?,
        verified: row.try_get("verified").map_err(StoreError::backend)?,
        photo: row.try_get("profile").map_err(StoreError::backend)?,
        provider: provider
            .parse::<AuthProvider>()
            .map_err(|e| StoreError::backend(anyhow::anyhow!(e)))?,
    })
}

fn wallet_from_row(row: &PgRow) -> Result<Wallet, sqlx::Error> {
    Ok(Wallet {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        balance: row.try_get("balance")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl UserRepository for PgStore {
    async fn find_by_email(
        &self,
        email: &str,
        provider: AuthProvider,
    ) -> Result<UserWithSecret, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS}, password FROM users WHERE email = $1 AND provider = $2"
        ))
        .bind(email)
        .bind(provider.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| classify(e, "user"))?;

        Ok(UserWithSecret {
            user: user_from_row(&row)?,
            password_hash: row.try_get("password").map_err(StoreError::backend)?,
        })
    }

    async fn find_by_id(&self, id: Uuid) -> Result<User, StoreError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| classify(e, "user"))?;
        user_from_row(&row)
    }

    async fn create_with_wallet(&self, new_user: &NewCredentialUser) -> Result<User, StoreError> {
        let mut tx = self.pool.begin().await.map_err(StoreError::backend)?;

        let row = sqlx::query(&format!(
            "INSERT INTO users (name, email, password, provider) VALUES ($1, $2, $3, $4) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&new_user.name)
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(AuthProvider::Credentials.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| classify(e, "user"))?;
        let user = user_from_row(&row)?;

        sqlx::query("INSERT INTO wallets (user_id, balance) VALUES ($1, 0)")
            .bind(user.id)
            .execute(&mut *tx)
            .await
            .map_err(|e| classify(e, "wallet"))?;

        tx.commit().await.map_err(StoreError::backend)?;
        Ok(user)
    }

    async fn upsert_oauth_with_wallet(&self, profile: &OAuthProfile) -> Result<User, StoreError> {
        let mut tx = self.pool.begin().await.map_err(StoreError::backend)?;

        // xmax = 0 only for rows this statement inserted.
        let row = sqlx::query(&format!(
            "INSERT INTO users (name, email, profile, provider, verified) \
             VALUES ($1, $2, $3, $4, TRUE) \
             ON CONFLICT (email, provider) DO UPDATE \
             SET name = EXCLUDED.name, profile = EXCLUDED.profile, verified = TRUE, updated_at = NOW() \
             RETURNING {USER_COLUMNS}, (xmax = 0) AS inserted"
        ))
        .bind(&profile.name)
        .bind(&profile.email)
        .bind(&profile.photo)
        .bind(profile.provider.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| classify(e, "user"))?;
        let user = user_from_row(&row)?;
        let inserted: bool = row.try_get("inserted").map_err(StoreError::backend)?;

        if inserted {
            sqlx::query("INSERT INTO wallets (user_id, balance) VALUES ($1, 0)")
                .bind(user.id)
                .execute(&mut *tx)
                .await
                .map_err(|e| classify(e, "wallet"))?;
        }

        tx.commit().await.map_err(StoreError::backend)?;
        Ok(user)
    }

    async fn mark_verified(&self, id: Uuid) -> Result<(), StoreError> {
        let done = sqlx::query("UPDATE users SET verified = TRUE, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| classify(e, "user"))?;
        if done.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl WalletRepository for PgStore {
    async fn wallet_for_user(&self, user_id: Uuid) -> Result<Wallet, StoreError> {
        let row = sqlx::query(
            "SELECT id, user_id, balance, created_at, updated_at FROM wallets WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| classify(e, "wallet"))?;

        wallet_from_row(&row).map_err(StoreError::backend)
    }
}
