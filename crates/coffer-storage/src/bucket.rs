use async_trait::async_trait;
use bytes::Bytes;
use coffer_core::{Metadata, StorageConnection};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::AsyncReadExt;

use crate::client::{
    ClientError, ObjectClientFactory, ObjectHead, PutObjectRequest, ReplaceMetadataRequest,
    StorageClass,
};
use crate::traits::{Blob, BlobReader, BlobStore, StorageError, StorageResult};

/// Blob store over a single object-store bucket
///
/// Every token is prefixed with the connection's path to form the backend key.
/// No client is kept between calls: each operation asks the factory for one.
#[derive(Clone)]
pub struct Bucket {
    connection: StorageConnection,
    factory: Arc<dyn ObjectClientFactory>,
}

impl Bucket {
    pub fn new(connection: StorageConnection, factory: Arc<dyn ObjectClientFactory>) -> Self {
        Self {
            connection,
            factory,
        }
    }

    /// S3 bucket authenticated with explicit credentials.
    #[cfg(feature = "storage-s3")]
    pub fn s3(
        connection: StorageConnection,
        credentials: aws_credential_types::Credentials,
    ) -> Self {
        let factory = crate::s3::S3ClientFactory::new(&connection, credentials);
        Self::new(connection, Arc::new(factory))
    }

    /// S3 bucket using credentials and region from the AWS environment.
    #[cfg(feature = "storage-s3")]
    pub async fn s3_from_env(connection: StorageConnection) -> StorageResult<Self> {
        let factory = crate::s3::S3ClientFactory::from_env(&connection).await?;
        Ok(Self::new(connection, Arc::new(factory)))
    }

    pub fn connection(&self) -> &StorageConnection {
        &self.connection
    }

    /// Backend key for `token`, rejecting empty tokens.
    pub fn bucket_key(&self, token: &str) -> StorageResult<String> {
        validate_token(token)?;
        Ok(self.connection.key_for(token))
    }

    fn storage_class(&self) -> StorageResult<StorageClass> {
        Ok(if self.connection.reduced_redundancy()? {
            StorageClass::ReducedRedundancy
        } else {
            StorageClass::Standard
        })
    }
}

fn validate_token(token: &str) -> StorageResult<()> {
    if token.trim().is_empty() {
        return Err(StorageError::InvalidArgument(
            "token must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// Rebuild caller-facing metadata from backend headers.
fn metadata_from_head(head: ObjectHead) -> Metadata {
    let mut metadata = Metadata::new();
    if let Some(content_type) = head.content_type {
        metadata.set_content_type(content_type);
    }
    if let Some(last_modified) = head.last_modified {
        metadata.set_last_modified(last_modified);
    }
    if let Some(etag) = head.etag {
        metadata.set_etag(etag);
    }
    metadata.extend(head.metadata);
    metadata
}

fn custom_entries(metadata: &Metadata) -> Vec<(String, String)> {
    metadata
        .custom()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn client_error(key: &str, err: ClientError) -> StorageError {
    match err {
        ClientError::NotFound => StorageError::NotFound(key.to_string()),
        ClientError::Backend(source) => StorageError::Backend { source },
    }
}

#[async_trait]
impl BlobStore for Bucket {
    async fn exists(&self, token: &str) -> StorageResult<Option<Metadata>> {
        let key = self.bucket_key(token)?;
        let client = self.factory.create_client()?;

        match client.head_object(self.connection.bucket(), &key).await {
            Ok(head) => Ok(Some(metadata_from_head(head))),
            Err(ClientError::NotFound) => {
                tracing::debug!(bucket = %self.connection.bucket(), key = %key, "Blob does not exist");
                Ok(None)
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    bucket = %self.connection.bucket(),
                    key = %key,
                    "Blob existence check failed"
                );
                Err(client_error(&key, e))
            }
        }
    }

    async fn put(
        &self,
        token: &str,
        mut content: BlobReader,
        metadata: &Metadata,
    ) -> StorageResult<()> {
        let key = self.bucket_key(token)?;
        let storage_class = self.storage_class()?;
        let start = Instant::now();

        // The backend client takes a complete body, so the reader is drained first.
        let mut buffer = Vec::new();
        content.read_to_end(&mut buffer).await?;
        let size = buffer.len() as u64;

        let request = PutObjectRequest {
            bucket: self.connection.bucket().to_string(),
            key: key.clone(),
            body: Bytes::from(buffer),
            content_type: metadata.content_type().map(String::from),
            storage_class,
            metadata: custom_entries(metadata),
        };

        let client = self.factory.create_client()?;
        client.put_object(request).await.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.connection.bucket(),
                key = %key,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Blob upload failed"
            );
            client_error(&key, e)
        })?;

        tracing::info!(
            bucket = %self.connection.bucket(),
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Blob upload successful"
        );

        Ok(())
    }

    async fn get(&self, token: &str) -> StorageResult<Blob> {
        let key = self.bucket_key(token)?;
        let start = Instant::now();
        let client = self.factory.create_client()?;

        let (head, body) = client
            .get_object(self.connection.bucket(), &key)
            .await
            .map_err(|e| {
                if !matches!(e, ClientError::NotFound) {
                    tracing::error!(
                        error = %e,
                        bucket = %self.connection.bucket(),
                        key = %key,
                        duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                        "Blob download failed"
                    );
                }
                client_error(&key, e)
            })?;

        tracing::info!(
            bucket = %self.connection.bucket(),
            key = %key,
            size_bytes = head.content_length,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Blob opened for download"
        );

        let stream = body.map(|chunk| chunk.map_err(StorageError::from));

        Ok(Blob {
            stream: Box::pin(stream),
            metadata: metadata_from_head(head),
        })
    }

    async fn remove(&self, token: &str) -> StorageResult<()> {
        let key = self.bucket_key(token)?;
        let start = Instant::now();
        let client = self.factory.create_client()?;

        match client.delete_object(self.connection.bucket(), &key).await {
            Ok(()) | Err(ClientError::NotFound) => {}
            Err(e) => {
                tracing::error!(
                    error = %e,
                    bucket = %self.connection.bucket(),
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Blob delete failed"
                );
                return Err(client_error(&key, e));
            }
        }

        tracing::info!(
            bucket = %self.connection.bucket(),
            key = %key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Blob delete successful"
        );

        Ok(())
    }

    async fn metadata(&self, token: &str) -> StorageResult<Metadata> {
        let key = self.bucket_key(token)?;
        let client = self.factory.create_client()?;

        client
            .head_object(self.connection.bucket(), &key)
            .await
            .map(metadata_from_head)
            .map_err(|e| client_error(&key, e))
    }

    async fn put_metadata(&self, token: &str, metadata: &Metadata) -> StorageResult<()> {
        let key = self.bucket_key(token)?;
        let client = self.factory.create_client()?;

        let request = ReplaceMetadataRequest {
            bucket: self.connection.bucket().to_string(),
            key: key.clone(),
            content_type: metadata.content_type().map(String::from),
            metadata: custom_entries(metadata),
        };

        client.replace_metadata(request).await.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.connection.bucket(),
                key = %key,
                "Blob metadata update failed"
            );
            client_error(&key, e)
        })?;

        tracing::info!(bucket = %self.connection.bucket(), key = %key, "Blob metadata replaced");

        Ok(())
    }

    fn public_url(&self, token: &str) -> StorageResult<String> {
        validate_token(token)?;
        let template = self.connection.public_url().ok_or_else(|| {
            StorageError::NotSupported("storage is not public".to_string())
        })?;

        Ok(format!("{}{}", template, token))
    }

    fn is_public(&self) -> bool {
        self.connection.public_url().is_some()
    }
}
