//! Tracing initialization
//!
//! Installs a `tracing-subscriber` registry with an `EnvFilter` and the fmt layer.
//! `RUST_LOG` takes precedence over the configured default filter.

mod init_basic;

pub use init_basic::{init_telemetry, TelemetryConfig};
