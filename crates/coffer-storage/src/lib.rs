//! Coffer Storage Library
//!
//! This crate provides the blob store abstraction and its bucket implementation.
//! It includes the BlobStore trait, the object-client seam used to reach a backend,
//! an S3 backend and an in-process backend.
//!
//! # Key format
//!
//! A blob is addressed by a caller-chosen token. The backend key is the connection
//! path followed by the token, verbatim: with `Path=uploads/` the token `a.jpg`
//! is stored as `uploads/a.jpg`. No delimiter is inserted, so callers own the
//! placement of `/`.

pub mod bucket;
pub mod client;
#[cfg(feature = "storage-memory")]
pub mod memory;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use bucket::Bucket;
pub use client::{ClientError, ObjectClient, ObjectClientFactory, ObjectHead, StorageClass};
pub use coffer_core::{Metadata, StorageConnection};
#[cfg(feature = "storage-memory")]
pub use memory::MemoryObjectStore;
#[cfg(feature = "storage-s3")]
pub use s3::S3ClientFactory;
pub use traits::{Blob, BlobReader, BlobStore, BlobStream, StorageError, StorageResult};
