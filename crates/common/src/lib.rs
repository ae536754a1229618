//! Annalist Common Library
//!
//! Shared error type, test outcome model, environment lookup and
//! configuration for the Annalist crates.

pub mod config;
pub mod environment;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::AnnalistConfig;
pub use environment::{EnvironmentVariables, MockEnvironmentVariables, SystemEnvironmentVariables};
pub use error::{Error, Result};
pub use types::*;

/// Annalist version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default directory outcome artifacts and reports live in
pub fn default_report_path() -> std::path::PathBuf {
    std::path::PathBuf::from("target").join("site").join("annalist")
}
