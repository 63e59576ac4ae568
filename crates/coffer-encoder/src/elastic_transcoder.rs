use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_config::retry::RetryConfig;
use aws_config::BehaviorVersion;
use aws_credential_types::provider::SharedCredentialsProvider;
use aws_credential_types::Credentials;
use aws_sdk_elastictranscoder::config::Region;
use aws_sdk_elastictranscoder::types::{CreateJobOutput, JobInput};
use aws_sdk_elastictranscoder::Client;
use coffer_core::{ConfigError, EncoderConnection};

use crate::client::{CreateJobRequest, TranscoderClient, TranscoderClientFactory};
use crate::error::{EncodeError, EncodeResult};

#[derive(Debug, thiserror::Error)]
#[error("transcoder response did not include a job id")]
struct MissingJobId;

/// Builds AWS Elastic Transcoder clients
#[derive(Clone)]
pub struct ElasticTranscoderFactory {
    region: Option<String>,
    credentials: SharedCredentialsProvider,
}

impl ElasticTranscoderFactory {
    pub fn new(connection: &EncoderConnection, credentials: Credentials) -> Self {
        Self {
            region: connection.region().map(String::from),
            credentials: SharedCredentialsProvider::new(credentials),
        }
    }

    /// Resolve credentials (and the region, if the connection has none) from the
    /// standard AWS environment chain.
    pub async fn from_env(connection: &EncoderConnection) -> EncodeResult<Self> {
        let region_provider =
            RegionProviderChain::first_try(connection.region().map(|r| Region::new(r.to_string())))
                .or_default_provider();

        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(region_provider)
            .load()
            .await;

        let credentials = config
            .credentials_provider()
            .ok_or_else(|| ConfigError::missing("AWS credentials"))?;

        Ok(Self {
            region: config.region().map(|r| r.to_string()),
            credentials,
        })
    }
}

impl TranscoderClientFactory for ElasticTranscoderFactory {
    fn create_client(&self) -> EncodeResult<Box<dyn TranscoderClient>> {
        let region = self
            .region
            .clone()
            .ok_or_else(|| ConfigError::missing("Region"))?;

        let config = aws_sdk_elastictranscoder::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(region))
            .credentials_provider(self.credentials.clone())
            .retry_config(RetryConfig::standard())
            .build();

        Ok(Box::new(ElasticTranscoderClient {
            client: Client::from_conf(config),
        }))
    }
}

pub struct ElasticTranscoderClient {
    client: Client,
}

#[async_trait]
impl TranscoderClient for ElasticTranscoderClient {
    async fn create_job(&self, request: CreateJobRequest) -> EncodeResult<String> {
        let input = JobInput::builder().key(request.input_key).build();
        let output = CreateJobOutput::builder()
            .key(request.output_key)
            .preset_id(request.preset_id)
            .set_thumbnail_pattern(request.thumbnail_pattern)
            .build();

        let response = self
            .client
            .create_job()
            .pipeline_id(request.pipeline_id)
            .input(input)
            .output(output)
            .send()
            .await
            .map_err(EncodeError::backend)?;

        response
            .job()
            .and_then(|job| job.id())
            .map(String::from)
            .ok_or_else(|| EncodeError::backend(MissingJobId))
    }

    async fn read_job(&self, job_id: &str) -> EncodeResult<Option<String>> {
        let response = self
            .client
            .read_job()
            .id(job_id)
            .send()
            .await
            .map_err(EncodeError::backend)?;

        Ok(response.job().and_then(|job| job.status()).map(String::from))
    }
}
