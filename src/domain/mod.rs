//! Domain layer - Core business types and rules.
//!
//! Pure types and validation for orders, identities, OTP codes,
//! markets, wallets and football metadata. No I/O happens here
//! (hexagonal architecture inner ring).

pub mod error;
pub mod football;
pub mod identity;
pub mod market;
pub mod order;
pub mod otp;

// Re-export core types for convenience
pub use error::{ErrorKind, ServiceError, StoreError};
pub use identity::{AuthProvider, Identity, User};
pub use market::{Market, Wallet};
pub use order::{Order, OrderId, OrderRequest, OrderSide, PlacedOrder};
