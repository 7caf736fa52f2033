//! # COI Common Library
//!
//! Shared code for the conflict-of-interest tooling:
//! - Error and result types
//! - TOML configuration loading and data folder resolution
//! - Logging initialisation

pub mod config;
pub mod error;
pub mod logging;

pub use error::{Error, Result};
