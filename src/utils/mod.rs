//! Utility modules for error handling, configuration and platform glue

pub mod bundle_paths;
pub mod config;
pub mod error;
pub mod platform;

// Re-export for convenience
pub use bundle_paths::{BinaryLocator, Candidate};
pub use config::{Settings, SettingsStore};
pub use error::AspError;
