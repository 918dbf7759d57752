//! Common utilities shared across the gateway crates.
//!
//! This crate provides:
//! - Unified error handling for the data-access layer
//! - Configuration structures
//! - Shared constants (pagination defaults, command timeouts)

pub mod config;
pub mod constants;
pub mod error;

pub use config::*;
pub use constants::*;
pub use error::{AppError, AppResult, OptionExt};
