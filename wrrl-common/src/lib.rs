//! # WRRL Common Library
//!
//! Shared code for the WRRL (Work Rights & Royalty Ledger) services:
//! - Ledger record types and input validation
//! - Event types (LedgerEvent enum)
//! - Error taxonomy (domain rejections and infrastructure errors)
//! - Configuration loading and root folder resolution
//! - Database initialization and shared schema
//! - API authentication (timestamp + hash with shared secret)
//! - SSE utilities

pub mod api;
pub mod config;
#[cfg(feature = "sqlx")]
pub mod db;
pub mod error;
pub mod events;
pub mod records;
pub mod sse;

pub use error::{Error, LedgerError, LedgerResult, Result};
