//! Use Cases Layer - Application Business Logic
//!
//! Orchestrates domain types and ports to implement the service's
//! operations. Each use case is a struct holding `Arc<dyn Port>`
//! handles, so the same code runs against in-memory and production
//! adapters.
//!
//! Use cases:
//! - `OrderIntake`: validate and append orders to per-market logs
//! - `TokenService`: refresh token lifecycle, access token signing
//! - `OtpService`: single-use verification codes
//! - `AuthService`: sign-up/in/out, refresh, verification, OAuth
//! - `MarketService` / `WalletService`: read-mostly queries
//! - `FootballMetaService`: competitions, standings and seasons
//! - `LeagueStats`: football metadata seeding and standings sync

pub mod auth_service;
pub mod football_meta_service;
pub mod league_stats;
pub mod market_service;
pub mod order_intake;
pub mod otp_service;
pub mod token_service;
pub mod wallet_service;

pub use auth_service::{AuthService, Session};
pub use football_meta_service::FootballMetaService;
pub use league_stats::{LeagueStats, SyncReport};
pub use market_service::MarketService;
pub use order_intake::OrderIntake;
pub use otp_service::OtpService;
pub use token_service::{TokenService, TokenSettings};
pub use wallet_service::WalletService;
