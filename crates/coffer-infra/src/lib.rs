//! Coffer Infrastructure Library
//!
//! Tracing setup, zip archiving and temporary file handling used alongside the
//! storage and encoder crates.

pub mod error;
pub mod telemetry;

#[cfg(feature = "archive")]
pub mod archive;

#[cfg(feature = "temporary")]
pub mod temporary;

#[cfg(feature = "archive")]
pub use archive::{Archiver, ZipArchiver};
#[cfg(feature = "archive")]
pub use error::ArchiveError;

#[cfg(feature = "temporary")]
pub use error::TemporaryError;
#[cfg(feature = "temporary")]
pub use temporary::{TemporaryDirectory, TemporaryFile, TemporaryStorage};

pub use telemetry::{init_telemetry, TelemetryConfig};
