use coffer_core::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Transcoder backend error: {source}")]
    Backend {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Wait cancelled")]
    Cancelled,

    #[error("Wait timed out")]
    TimedOut,
}

impl EncodeError {
    pub fn backend<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::Backend {
            source: error.into(),
        }
    }
}

pub type EncodeResult<T> = Result<T, EncodeError>;
