//! In-Memory Adapters
//!
//! Process-local implementations of every storage port. Used by the
//! `memory` storage backend, integration tests and benchmarks. Each
//! store guards its state with a tokio lock, which plays the role of the
//! external store's own serialization.

pub mod catalog;
pub mod order_log;
pub mod otp_store;
pub mod token_store;
pub mod users;

pub use catalog::MemoryCatalog;
pub use order_log::MemoryOrderLog;
pub use otp_store::MemoryOtpStore;
pub use token_store::MemoryTokenStore;
pub use users::MemoryUserStore;
