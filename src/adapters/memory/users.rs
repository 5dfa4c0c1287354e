//! Users and wallets behind one lock, so a user and its wallet appear
//! together or not at all.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::StoreError;
use crate::domain::identity::{
    AuthProvider, NewCredentialUser, OAuthProfile, User, UserWithSecret,
};
use crate::domain::market::Wallet;
use crate::ports::repository::{UserRepository, WalletRepository};

/// Account type stored for every self-registered user.
const USER_KIND: &str = "user";

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<Uuid, UserWithSecret>,
    wallets: HashMap<Uuid, Wallet>,
}

impl Tables {
    fn by_email_mut(&mut self, email: &str, provider: AuthProvider) -> Option<&mut UserWithSecret> {
        self.users
            .values_mut()
            .find(|u| u.user.email == email && u.user.provider == provider)
    }

    fn insert_with_wallet(&mut self, user: User, password_hash: Option<String>) -> User {
        self.wallets.insert(user.id, Wallet::empty(user.id));
        self.users.insert(
            user.id,
            UserWithSecret {
                user: user.clone(),
                password_hash,
            },
        );
        user
    }
}

#[derive(Debug, Default)]
pub struct MemoryUserStore {
    tables: RwLock<Tables>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of wallets; always equal to the number of users.
    pub async fn wallet_count(&self) -> usize {
        self.tables.read().await.wallets.len()
    }
}

#[async_trait]
impl UserRepository for MemoryUserStore {
    async fn find_by_email(
        &self,
        email: &str,
        provider: AuthProvider,
    ) -> Result<UserWithSecret, StoreError> {
        let tables = self.tables.read().await;
        tables
            .users
            .values()
            .find(|u| u.user.email == email && u.user.provider == provider)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<User, StoreError> {
        let tables = self.tables.read().await;
        tables
            .users
            .get(&id)
            .map(|u| u.user.clone())
            .ok_or(StoreError::NotFound)
    }

    async fn create_with_wallet(&self, new_user: &NewCredentialUser) -> Result<User, StoreError> {
        let mut tables = self.tables.write().await;
        if tables
            .by_email_mut(&new_user.email, AuthProvider::Credentials)
            .is_some()
        {
            return Err(StoreError::Conflict(format!("user {}", new_user.email)));
        }
        let user = User {
            id: Uuid::new_v4(),
            kind: USER_KIND.to_string(),
            name: new_user.name.clone(),
            email: new_user.email.clone(),
            verified: false,
            photo: String::new(),
            provider: AuthProvider::Credentials,
        };
        Ok(tables.insert_with_wallet(user, Some(new_user.password_hash.clone())))
    }

    async fn upsert_oauth_with_wallet(&self, profile: &OAuthProfile) -> Result<User, StoreError> {
        let mut tables = self.tables.write().await;
        if let Some(existing) = tables.by_email_mut(&profile.email, profile.provider) {
            existing.user.name.clone_from(&profile.name);
            existing.user.photo.clone_from(&profile.photo);
            existing.user.verified = true;
            return Ok(existing.user.clone());
        }
        let user = User {
            id: Uuid::new_v4(),
            kind: USER_KIND.to_string(),
            name: profile.name.clone(),
            email: profile.email.clone(),
            verified: true,
            photo: profile.photo.clone(),
            provider: profile.provider,
        };
        Ok(tables.insert_with_wallet(user, None))
    }

    async fn mark_verified(&self, id: Uuid) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let row = tables.users.get_mut(&id).ok_or(StoreError::NotFound)?;
        row.user.verified = true;
        Ok(())
    }
}

#[async_trait]
impl WalletRepository for MemoryUserStore {
    async fn wallet_for_user(&self, user_id: Uuid) -> Result<Wallet, StoreError> {
        let tables = self.tables.read().await;
        tables
            .wallets
            .get(&user_id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }
}
