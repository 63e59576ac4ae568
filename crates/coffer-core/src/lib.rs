//! Coffer Core Library
//!
//! Connection-string configuration, blob metadata and the configuration error
//! type shared by the storage, encoder and infrastructure crates.

pub mod config;
pub mod error;
pub mod metadata;

// Re-export commonly used types
pub use config::{ConnectionString, EncoderConnection, StorageConnection};
pub use error::ConfigError;
pub use metadata::Metadata;
