//! Outbound REST Clients
//!
//! reqwest-based adapters for the football-data.org API and the mail
//! server.

pub mod client;
pub mod mail;

pub use client::{FootballClientConfig, FootballDataClient};
pub use mail::HttpMailer;
