use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_config::retry::RetryConfig;
use aws_config::BehaviorVersion;
use aws_credential_types::provider::SharedCredentialsProvider;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::operation::head_object::HeadObjectError;
use aws_sdk_s3::primitives::{ByteStream, DateTime as SmithyDateTime};
use aws_sdk_s3::types::{MetadataDirective, StorageClass as S3StorageClass};
use aws_sdk_s3::Client;
use chrono::{DateTime, Utc};
use coffer_core::{ConfigError, StorageConnection};
use std::collections::HashMap;
use tokio_util::io::ReaderStream;

use crate::client::{
    ClientError, ClientResult, ObjectBody, ObjectClient, ObjectClientFactory, ObjectHead,
    PutObjectRequest, ReplaceMetadataRequest, StorageClass,
};
use crate::traits::{StorageError, StorageResult};

/// Builds S3 clients for a [`Bucket`](crate::Bucket)
///
/// The region is only checked when a client is built, so a connection string
/// without one parses fine and fails on the first storage call.
#[derive(Clone)]
pub struct S3ClientFactory {
    region: Option<String>,
    endpoint_url: Option<String>, // Custom endpoint for S3-compatible providers
    credentials: SharedCredentialsProvider,
}

impl S3ClientFactory {
    pub fn new(connection: &StorageConnection, credentials: Credentials) -> Self {
        Self {
            region: connection.region().map(String::from),
            endpoint_url: connection.endpoint().map(String::from),
            credentials: SharedCredentialsProvider::new(credentials),
        }
    }

    /// Resolve credentials (and the region, if the connection has none) from the
    /// standard AWS environment chain.
    pub async fn from_env(connection: &StorageConnection) -> StorageResult<Self> {
        let region_provider =
            RegionProviderChain::first_try(connection.region().map(|r| Region::new(r.to_string())))
                .or_default_provider();

        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(region_provider)
            .load()
            .await;

        let credentials = config
            .credentials_provider()
            .ok_or_else(|| StorageError::Config(ConfigError::missing("AWS credentials")))?;

        Ok(Self {
            region: config.region().map(|r| r.to_string()),
            endpoint_url: connection.endpoint().map(String::from),
            credentials,
        })
    }
}

impl ObjectClientFactory for S3ClientFactory {
    fn create_client(&self) -> StorageResult<Box<dyn ObjectClient>> {
        let region = self
            .region
            .clone()
            .ok_or_else(|| StorageError::Config(ConfigError::missing("Region")))?;

        let mut builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(region))
            .credentials_provider(self.credentials.clone())
            .retry_config(RetryConfig::standard());

        if let Some(ref endpoint) = self.endpoint_url {
            // Path-style addressing is required by MinIO and most S3-compatible providers
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Ok(Box::new(S3ObjectClient {
            client: Client::from_conf(builder.build()),
        }))
    }
}

/// S3 object client
pub struct S3ObjectClient {
    client: Client,
}

fn to_chrono(value: Option<&SmithyDateTime>) -> Option<DateTime<Utc>> {
    value.and_then(|dt| DateTime::from_timestamp(dt.secs(), dt.subsec_nanos()))
}

fn user_metadata(metadata: Option<&HashMap<String, String>>) -> Vec<(String, String)> {
    let mut entries: Vec<(String, String)> = metadata
        .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        .unwrap_or_default();
    entries.sort();
    entries
}

fn content_length(value: Option<i64>) -> Option<u64> {
    value.and_then(|len| u64::try_from(len).ok())
}

#[async_trait]
impl ObjectClient for S3ObjectClient {
    async fn head_object(&self, bucket: &str, key: &str) -> ClientResult<ObjectHead> {
        let response = self
            .client
            .head_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if matches!(&e, SdkError::ServiceError(service_err)
                    if matches!(service_err.err(), HeadObjectError::NotFound(_)))
                {
                    ClientError::NotFound
                } else {
                    ClientError::backend(e)
                }
            })?;

        Ok(ObjectHead {
            content_type: response.content_type().map(String::from),
            last_modified: to_chrono(response.last_modified()),
            etag: response.e_tag().map(String::from),
            content_length: content_length(response.content_length()),
            metadata: user_metadata(response.metadata()),
        })
    }

    async fn get_object(&self, bucket: &str, key: &str) -> ClientResult<(ObjectHead, ObjectBody)> {
        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if matches!(&e, SdkError::ServiceError(service_err)
                    if matches!(service_err.err(), GetObjectError::NoSuchKey(_)))
                {
                    ClientError::NotFound
                } else {
                    ClientError::backend(e)
                }
            })?;

        let head = ObjectHead {
            content_type: response.content_type().map(String::from),
            last_modified: to_chrono(response.last_modified()),
            etag: response.e_tag().map(String::from),
            content_length: content_length(response.content_length()),
            metadata: user_metadata(response.metadata()),
        };

        // Convert ByteStream to a chunk stream via AsyncRead + ReaderStream
        let body: ObjectBody = Box::pin(ReaderStream::new(response.body.into_async_read()));

        Ok((head, body))
    }

    async fn put_object(&self, request: PutObjectRequest) -> ClientResult<()> {
        let storage_class = match request.storage_class {
            StorageClass::Standard => S3StorageClass::Standard,
            StorageClass::ReducedRedundancy => S3StorageClass::ReducedRedundancy,
        };

        let mut builder = self
            .client
            .put_object()
            .bucket(&request.bucket)
            .key(&request.key)
            .body(ByteStream::from(request.body))
            .storage_class(storage_class);

        if let Some(content_type) = request.content_type {
            builder = builder.content_type(content_type);
        }
        for (k, v) in request.metadata {
            builder = builder.metadata(k, v);
        }

        builder.send().await.map_err(ClientError::backend)?;
        Ok(())
    }

    async fn replace_metadata(&self, request: ReplaceMetadataRequest) -> ClientResult<()> {
        // URL-encode the copy source per AWS S3 API requirements
        let copy_source = format!(
            "{}/{}",
            request.bucket,
            urlencoding::encode(&request.key)
        );

        let mut builder = self
            .client
            .copy_object()
            .bucket(&request.bucket)
            .key(&request.key)
            .copy_source(copy_source)
            .metadata_directive(MetadataDirective::Replace);

        if let Some(content_type) = request.content_type {
            builder = builder.content_type(content_type);
        }
        for (k, v) in request.metadata {
            builder = builder.metadata(k, v);
        }

        builder.send().await.map_err(|e| {
            // CopyObject has no modeled "missing source" error; rely on the status code.
            if matches!(&e, SdkError::ServiceError(service_err)
                if service_err.raw().status().as_u16() == 404)
            {
                ClientError::NotFound
            } else {
                ClientError::backend(e)
            }
        })?;
        Ok(())
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> ClientResult<()> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(ClientError::backend)?;
        Ok(())
    }
}
