//! Configuration error type
//!
//! Raised when a connection string cannot be tokenized, when a single value is
//! read and turns out to be unusable, or when a required setting is missing.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Malformed connection string: {0}")]
    Malformed(String),

    #[error("Invalid value for `{key}`: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing configuration: {0}")]
    Missing(String),
}

impl ConfigError {
    pub fn invalid_value<K: Into<String>, V: Into<String>>(key: K, value: V) -> Self {
        Self::InvalidValue {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn missing<S: Into<String>>(what: S) -> Self {
        Self::Missing(what.into())
    }
}
