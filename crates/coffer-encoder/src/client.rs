//! Transcoding service client seam
//!
//! [`Encoder`](crate::Encoder) and [`EncodeJob`](crate::EncodeJob) reach the
//! backend only through [`TranscoderClient`]. A new client is built by the
//! [`TranscoderClientFactory`] for every request.

use async_trait::async_trait;

use crate::error::EncodeResult;

/// A single-output transcoding job submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateJobRequest {
    pub pipeline_id: String,
    pub preset_id: String,
    pub input_key: String,
    pub output_key: String,
    pub thumbnail_pattern: Option<String>,
}

#[async_trait]
pub trait TranscoderClient: Send + Sync {
    /// Submit a job and return the backend's job id.
    async fn create_job(&self, request: CreateJobRequest) -> EncodeResult<String>;

    /// Current status string reported for `job_id`, if any.
    async fn read_job(&self, job_id: &str) -> EncodeResult<Option<String>>;
}

pub trait TranscoderClientFactory: Send + Sync {
    fn create_client(&self) -> EncodeResult<Box<dyn TranscoderClient>>;
}
