//! In-process object store
//!
//! Keeps objects in a shared map and implements both [`ObjectClient`] and
//! [`ObjectClientFactory`]. Clones share state, so a test can keep one handle for
//! assertions while a [`Bucket`](crate::Bucket) uses another.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::client::{
    ClientError, ClientResult, ObjectBody, ObjectClient, ObjectClientFactory, ObjectHead,
    PutObjectRequest, ReplaceMetadataRequest, StorageClass,
};
use crate::traits::StorageResult;

/// An object as held by [`MemoryObjectStore`].
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub head: ObjectHead,
    pub body: Bytes,
    pub storage_class: StorageClass,
}

#[derive(Default)]
struct Inner {
    objects: Mutex<HashMap<(String, String), StoredObject>>,
    failure: Mutex<Option<String>>,
    clients: AtomicUsize,
    revision: AtomicUsize,
}

#[derive(Clone, Default)]
pub struct MemoryObjectStore {
    inner: Arc<Inner>,
}

#[derive(Debug, thiserror::Error)]
#[error("injected backend failure: {0}")]
struct InjectedFailure(String);

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next client call fail with a backend error.
    pub fn fail_next_with(&self, message: &str) {
        *lock(&self.inner.failure) = Some(message.to_string());
    }

    /// Number of clients handed out so far.
    pub fn client_count(&self) -> usize {
        self.inner.clients.load(Ordering::SeqCst)
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        lock(&self.inner.objects)
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    pub fn len(&self) -> usize {
        lock(&self.inner.objects).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn take_failure(&self) -> ClientResult<()> {
        match lock(&self.inner.failure).take() {
            Some(message) => Err(ClientError::backend(InjectedFailure(message))),
            None => Ok(()),
        }
    }

    fn next_etag(&self) -> String {
        let revision = self.inner.revision.fetch_add(1, Ordering::SeqCst) + 1;
        format!("\"{:032x}\"", revision)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn object_key(bucket: &str, key: &str) -> (String, String) {
    (bucket.to_string(), key.to_string())
}

#[async_trait]
impl ObjectClient for MemoryObjectStore {
    async fn head_object(&self, bucket: &str, key: &str) -> ClientResult<ObjectHead> {
        self.take_failure()?;
        lock(&self.inner.objects)
            .get(&object_key(bucket, key))
            .map(|object| object.head.clone())
            .ok_or(ClientError::NotFound)
    }

    async fn get_object(&self, bucket: &str, key: &str) -> ClientResult<(ObjectHead, ObjectBody)> {
        self.take_failure()?;
        let object = lock(&self.inner.objects)
            .get(&object_key(bucket, key))
            .cloned()
            .ok_or(ClientError::NotFound)?;

        let body: ObjectBody = Box::pin(futures::stream::iter(vec![Ok(object.body)]));
        Ok((object.head, body))
    }

    async fn put_object(&self, request: PutObjectRequest) -> ClientResult<()> {
        self.take_failure()?;
        let head = ObjectHead {
            content_type: request.content_type,
            last_modified: Some(Utc::now()),
            etag: Some(self.next_etag()),
            content_length: Some(request.body.len() as u64),
            metadata: request.metadata,
        };

        lock(&self.inner.objects).insert(
            object_key(&request.bucket, &request.key),
            StoredObject {
                head,
                body: request.body,
                storage_class: request.storage_class,
            },
        );
        Ok(())
    }

    async fn replace_metadata(&self, request: ReplaceMetadataRequest) -> ClientResult<()> {
        self.take_failure()?;
        let etag = self.next_etag();
        let mut objects = lock(&self.inner.objects);
        let object = objects
            .get_mut(&object_key(&request.bucket, &request.key))
            .ok_or(ClientError::NotFound)?;

        object.head.content_type = request.content_type;
        object.head.metadata = request.metadata;
        object.head.last_modified = Some(Utc::now());
        object.head.etag = Some(etag);
        Ok(())
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> ClientResult<()> {
        self.take_failure()?;
        lock(&self.inner.objects).remove(&object_key(bucket, key));
        Ok(())
    }
}

impl ObjectClientFactory for MemoryObjectStore {
    fn create_client(&self) -> StorageResult<Box<dyn ObjectClient>> {
        self.inner.clients.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(self.clone()))
    }
}
