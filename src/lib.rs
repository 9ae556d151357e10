//! Renewal Watch - daily due-order job for a spreadsheet-backed order book
//!
//! Each run reads the order sheet once, announces orders that expire in
//! exactly four days to a Telegram topic (with price and payment QR code),
//! and deletes orders whose expiry date has passed.
//!
//! # Modules
//!
//! - `jobs` - Scan, notify and cleanup passes plus the job entry point
//! - `caption` / `pricing` - Message text and price resolution for one order
//! - `sheets` / `telegram` / `qr` - External services behind traits
//! - `config` - Layered configuration (defaults, `config.toml`, environment)
//! - `sim` - In-memory services for tests and dry runs

pub mod caption;
pub mod columns;
pub mod config;
pub mod error_reporter;
pub mod errors;
pub mod jobs;
pub mod logging;
pub mod pacing;
pub mod pricing;
pub mod qr;
pub mod sheets;
pub mod sim;
pub mod telegram;
pub mod text;
