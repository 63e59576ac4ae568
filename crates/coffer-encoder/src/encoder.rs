use coffer_core::{ConfigError, EncoderConnection};
use std::sync::Arc;
use std::time::Instant;

use crate::client::{CreateJobRequest, TranscoderClientFactory};
use crate::error::{EncodeError, EncodeResult};
use crate::job::EncodeJob;

/// Submits transcoding jobs for a single pipeline and preset
///
/// Source, output and thumbnail names are prefixed with the connection's path.
#[derive(Clone)]
pub struct Encoder {
    connection: EncoderConnection,
    factory: Arc<dyn TranscoderClientFactory>,
}

impl Encoder {
    pub fn new(connection: EncoderConnection, factory: Arc<dyn TranscoderClientFactory>) -> Self {
        Self {
            connection,
            factory,
        }
    }

    /// Encoder backed by AWS Elastic Transcoder with explicit credentials.
    #[cfg(feature = "encoder-aws")]
    pub fn elastic_transcoder(
        connection: EncoderConnection,
        credentials: aws_credential_types::Credentials,
    ) -> Self {
        let factory = crate::elastic_transcoder::ElasticTranscoderFactory::new(&connection, credentials);
        Self::new(connection, Arc::new(factory))
    }

    /// Encoder backed by AWS Elastic Transcoder using the AWS environment.
    #[cfg(feature = "encoder-aws")]
    pub async fn elastic_transcoder_from_env(connection: EncoderConnection) -> EncodeResult<Self> {
        let factory = crate::elastic_transcoder::ElasticTranscoderFactory::from_env(&connection).await?;
        Ok(Self::new(connection, Arc::new(factory)))
    }

    pub fn connection(&self) -> &EncoderConnection {
        &self.connection
    }

    /// Start transcoding `source` into `output`.
    ///
    /// When `thumbnail_pattern` is given, thumbnails are written to
    /// `path + pattern + "-{count}"`.
    pub async fn encode(
        &self,
        source: &str,
        output: &str,
        thumbnail_pattern: Option<&str>,
    ) -> EncodeResult<EncodeJob> {
        if source.trim().is_empty() {
            return Err(EncodeError::InvalidArgument("source must not be empty".to_string()));
        }
        if output.trim().is_empty() {
            return Err(EncodeError::InvalidArgument("output must not be empty".to_string()));
        }

        let pipeline_id = self
            .connection
            .pipeline_id()
            .ok_or_else(|| ConfigError::missing("PipelineId"))?;
        let preset_id = self
            .connection
            .preset_id()
            .ok_or_else(|| ConfigError::missing("PresetId"))?;

        let request = CreateJobRequest {
            pipeline_id: pipeline_id.to_string(),
            preset_id: preset_id.to_string(),
            input_key: self.connection.key_for(source),
            output_key: self.connection.key_for(output),
            thumbnail_pattern: thumbnail_pattern
                .map(|pattern| format!("{}-{{count}}", self.connection.key_for(pattern))),
        };

        let start = Instant::now();
        let client = self.factory.create_client()?;
        let job_id = client.create_job(request.clone()).await.map_err(|e| {
            tracing::error!(
                error = %e,
                pipeline_id = %request.pipeline_id,
                input_key = %request.input_key,
                "Failed to submit transcoding job"
            );
            e
        })?;

        tracing::info!(
            job_id = %job_id,
            pipeline_id = %request.pipeline_id,
            preset_id = %request.preset_id,
            input_key = %request.input_key,
            output_key = %request.output_key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Transcoding job submitted"
        );

        Ok(EncodeJob::new(
            job_id,
            request.input_key,
            request.output_key,
            request.thumbnail_pattern,
            self.factory.clone(),
        ))
    }
}
