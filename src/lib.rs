//! Achievement gateway
//!
//! Backend for the achievement editor. Scrapes Lodestone character,
//! achievement and item pages for authenticated operators, mirrors their
//! images into storage and saves edited JSON documents under a fixed set
//! of paths.

pub mod allowlist;
pub mod auth;
pub mod config;
pub mod extract;
pub mod fetcher;
pub mod logging;
pub mod rate_limit;
pub mod routes;
pub mod server;
pub mod storage;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{GatewayError, Result};
