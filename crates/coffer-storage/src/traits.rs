//! Blob store abstraction trait
//!
//! This module defines the BlobStore trait that every backend-facing store implements,
//! together with the storage error type.

use async_trait::async_trait;
use bytes::Bytes;
use coffer_core::{ConfigError, Metadata};
use futures::Stream;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::pin::Pin;
use thiserror::Error;
use tokio::io::AsyncRead;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Blob not found: {0}")]
    NotFound(String),

    #[error("Operation not supported: {0}")]
    NotSupported(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage backend error: {source}")]
    Backend {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    /// Wrap a backend failure without interpreting it
    pub fn backend<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::Backend {
            source: error.into(),
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Content handed to [`BlobStore::put`]; read until EOF.
pub type BlobReader = Pin<Box<dyn AsyncRead + Send + Unpin>>;

/// Content returned by [`BlobStore::get`], yielded in chunks.
pub type BlobStream = Pin<Box<dyn Stream<Item = StorageResult<Bytes>> + Send>>;

/// A blob opened for reading.
///
/// The stream is single-use; dropping it releases the underlying connection.
pub struct Blob {
    pub stream: BlobStream,
    pub metadata: Metadata,
}

impl Blob {
    /// Drain the stream into memory.
    pub async fn bytes(self) -> StorageResult<Bytes> {
        use futures::TryStreamExt;

        let chunks: Vec<Bytes> = self.stream.try_collect().await?;
        Ok(Bytes::from(chunks.concat()))
    }
}

impl Debug for Blob {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("Blob")
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

/// Blob storage abstraction trait
///
/// Every operation takes a caller-chosen `token`. Implementations derive the
/// backend key from it and reject empty tokens with
/// [`StorageError::InvalidArgument`] before doing any I/O.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Look up a blob's metadata, `None` when it does not exist.
    async fn exists(&self, token: &str) -> StorageResult<Option<Metadata>>;

    /// Upload `content` under `token`, creating or overwriting the blob.
    ///
    /// The content type is taken from `metadata`; custom entries are stored
    /// alongside the object. A failed upload must be retried as a whole.
    async fn put(&self, token: &str, content: BlobReader, metadata: &Metadata)
        -> StorageResult<()>;

    /// Open a blob for reading. Fails with [`StorageError::NotFound`] if it does not exist.
    async fn get(&self, token: &str) -> StorageResult<Blob>;

    /// Delete a blob. Deleting a missing blob succeeds.
    async fn remove(&self, token: &str) -> StorageResult<()>;

    /// Metadata of an existing blob.
    async fn metadata(&self, token: &str) -> StorageResult<Metadata>;

    /// Replace the content type and custom metadata of an existing blob.
    async fn put_metadata(&self, token: &str, metadata: &Metadata) -> StorageResult<()>;

    /// Externally reachable URL for `token`.
    ///
    /// Fails with [`StorageError::NotSupported`] when the store is not public.
    /// The token is appended as-is, without escaping.
    fn public_url(&self, token: &str) -> StorageResult<String>;

    fn is_public(&self) -> bool;

    async fn contains(&self, token: &str) -> StorageResult<bool> {
        Ok(self.exists(token).await?.is_some())
    }
}
