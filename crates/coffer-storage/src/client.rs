//! Object-store client seam
//!
//! [`Bucket`](crate::Bucket) talks to the backend only through [`ObjectClient`].
//! Authentication, region and endpoint selection live in the
//! [`ObjectClientFactory`], which hands out a fresh client for every operation.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::Stream;
use std::io;
use std::pin::Pin;
use thiserror::Error;

use crate::traits::StorageResult;

/// Backend failures, with "not found" kept distinct from everything else.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("object not found")]
    NotFound,

    #[error(transparent)]
    Backend(Box<dyn std::error::Error + Send + Sync>),
}

impl ClientError {
    pub fn backend<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend(Box::new(error))
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

/// Raw object body as produced by the backend.
pub type ObjectBody = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>;

/// Object headers as reported by the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectHead {
    pub content_type: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
    pub etag: Option<String>,
    pub content_length: Option<u64>,
    /// User-defined metadata
    pub metadata: Vec<(String, String)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageClass {
    #[default]
    Standard,
    ReducedRedundancy,
}

#[derive(Debug, Clone)]
pub struct PutObjectRequest {
    pub bucket: String,
    pub key: String,
    pub body: Bytes,
    pub content_type: Option<String>,
    pub storage_class: StorageClass,
    pub metadata: Vec<(String, String)>,
}

/// Replace an object's content type and user metadata, keeping its content.
#[derive(Debug, Clone)]
pub struct ReplaceMetadataRequest {
    pub bucket: String,
    pub key: String,
    pub content_type: Option<String>,
    pub metadata: Vec<(String, String)>,
}

#[async_trait]
pub trait ObjectClient: Send + Sync {
    async fn head_object(&self, bucket: &str, key: &str) -> ClientResult<ObjectHead>;

    async fn get_object(&self, bucket: &str, key: &str) -> ClientResult<(ObjectHead, ObjectBody)>;

    async fn put_object(&self, request: PutObjectRequest) -> ClientResult<()>;

    async fn replace_metadata(&self, request: ReplaceMetadataRequest) -> ClientResult<()>;

    async fn delete_object(&self, bucket: &str, key: &str) -> ClientResult<()>;
}

/// Builds one client per storage operation.
pub trait ObjectClientFactory: Send + Sync {
    fn create_client(&self) -> StorageResult<Box<dyn ObjectClient>>;
}
