//! Ports Layer - Hexagonal Architecture Boundaries
//!
//! Defines the interfaces (traits) that the usecases layer requires
//! from the outside world. Adapters implement these traits.
//!
//! Port categories:
//! - `TokenStore`: Refresh-token persistence
//! - `OtpStore`: Expiring one-time codes
//! - `OrderLog`: Per-market append-only order log
//! - `repository`: Users, wallets, markets and football metadata
//! - `MailDispatcher` / `StandingsProvider`: Outbound HTTP services

pub mod mail;
pub mod order_log;
pub mod otp_store;
pub mod repository;
pub mod standings;
pub mod token_store;

pub use mail::{MailDispatcher, OutboundMail};
pub use order_log::OrderLog;
pub use otp_store::OtpStore;
pub use repository::{
  FootballMetaRepository, MarketRepository, UserRepository, WalletRepository,
};
pub use standings::StandingsProvider;
pub use token_store::{StoredRefreshToken, TokenStore};
