//! Storefront - server-rendered shop and product admin panel
//!
//! The binary in `main.rs` only parses arguments and sets up logging;
//! everything else lives here so tests can build isolated instances.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod server;
pub mod shop;
pub mod state;
pub mod upload;
pub mod web;

pub use error::{AppError, Result};
