//! Wallet Service - Caller's Wallet Lookup

use std::sync::Arc;

use crate::domain::identity::Identity;
use crate::domain::market::Wallet;
use crate::domain::{ServiceError, StoreError};
use crate::ports::repository::WalletRepository;

pub struct WalletService {
  repo: Arc<dyn WalletRepository>,
}

impl WalletService {
  pub fn new(repo: Arc<dyn WalletRepository>) -> Self {
    Self { repo }
  }

  pub async fn wallet_of(&self, identity: &Identity) -> Result<Wallet, ServiceError> {
    self.repo.wallet_for_user(identity.id).await.map_err(|e| match e {
      StoreError::NotFound => ServiceError::not_found("no wallet for this account"),
      other => other.into(),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::adapters::memory::MemoryUserStore;
  use crate::domain::ErrorKind;
  use crate::domain::identity::NewCredentialUser;
  use crate::ports::repository::UserRepository;

  #[tokio::test]
  async fn test_wallet_created_with_user() {
    let store = Arc::new(MemoryUserStore::new());
    let user = store
      .create_with_wallet(&NewCredentialUser {
        email: "a@x.io".into(),
        name: "Ada".into(),
        password_hash: "h".into(),
      })
      .await
      .unwrap();
    let svc = WalletService::new(store);
    let wallet = svc.wallet_of(&user.identity()).await.unwrap();
    assert_eq!(wallet.user_id, user.id);
    assert_eq!(wallet.balance, 0);

    let mut stranger = user.identity();
    stranger.id = uuid::Uuid::new_v4();
    assert_eq!(svc.wallet_of(&stranger).await.unwrap_err().kind, ErrorKind::NotFound);
  }
}
