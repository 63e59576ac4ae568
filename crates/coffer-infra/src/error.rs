use std::io;
use thiserror::Error;

#[cfg(feature = "archive")]
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unsafe archive entry: {0}")]
    UnsafeEntry(String),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

#[cfg(feature = "temporary")]
#[derive(Debug, Error)]
pub enum TemporaryError {
    #[error("Failed to create temporary {kind}: {source}")]
    Create {
        kind: &'static str,
        #[source]
        source: io::Error,
    },
}
