//! Coffer Encoder Library
//!
//! Submits media transcoding jobs and tracks them to completion. A job moves
//! from `Started` to either `Complete` or `Failed`, and never leaves a terminal
//! state once one has been observed.

pub mod client;
pub mod encoder;
pub mod error;
pub mod job;

#[cfg(feature = "encoder-aws")]
pub mod elastic_transcoder;

pub use client::{CreateJobRequest, TranscoderClient, TranscoderClientFactory};
pub use encoder::Encoder;
pub use error::{EncodeError, EncodeResult};
pub use job::{EncodeJob, JobStatus, WaitOptions};

#[cfg(feature = "encoder-aws")]
pub use elastic_transcoder::ElasticTranscoderFactory;

pub use coffer_core::EncoderConnection;
pub use tokio_util::sync::CancellationToken;
