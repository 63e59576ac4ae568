#![cfg(feature = "storage-memory")]

use std::sync::Arc;

use bytes::Bytes;
use coffer_storage::{
    BlobReader, BlobStore, Bucket, MemoryObjectStore, Metadata, StorageConnection, StorageError,
};
use futures::StreamExt;
use tokio::io::AsyncWriteExt;

fn media_bucket() -> (Bucket, MemoryObjectStore) {
    let connection: StorageConnection = "Bucket=media;Path=uploads/;Region=us-east-1"
        .parse()
        .unwrap();
    let store = MemoryObjectStore::new();
    (Bucket::new(connection, Arc::new(store.clone())), store)
}

fn reader(data: &[u8]) -> BlobReader {
    Box::pin(std::io::Cursor::new(data.to_vec()))
}

#[tokio::test]
async fn test_exists_before_and_after_put() {
    let (bucket, _store) = media_bucket();

    assert!(bucket.exists("a.jpg").await.unwrap().is_none());
    assert!(!bucket.contains("a.jpg").await.unwrap());

    let metadata = Metadata::new().with_content_type("image/jpeg");
    bucket.put("a.jpg", reader(b"jpeg bytes"), &metadata).await.unwrap();

    let found = bucket.exists("a.jpg").await.unwrap().expect("blob should exist");
    assert_eq!(found.content_type(), Some("image/jpeg"));
    assert!(found.etag().is_some());
    assert!(found.last_modified().is_some());
    assert!(bucket.contains("a.jpg").await.unwrap());
}

#[tokio::test]
async fn test_derived_backend_key() {
    let (bucket, store) = media_bucket();

    assert_eq!(bucket.bucket_key("a.jpg").unwrap(), "uploads/a.jpg");

    bucket
        .put("a.jpg", reader(b"x"), &Metadata::default())
        .await
        .unwrap();
    assert!(store.object("media", "uploads/a.jpg").is_some());
    assert!(store.object("media", "a.jpg").is_none());
}

#[tokio::test]
async fn test_get_returns_put_content_and_metadata() {
    let (bucket, _store) = media_bucket();
    let metadata = Metadata::new()
        .with_content_type("text/plain")
        .with_entry("owner", "alice")
        .with_entry("Source", "camera-2");

    bucket.put("notes.txt", reader(b"hello world"), &metadata).await.unwrap();

    let blob = bucket.get("notes.txt").await.unwrap();
    assert_eq!(blob.metadata.content_type(), Some("text/plain"));

    let custom: Vec<_> = blob.metadata.custom().collect();
    let expected: Vec<_> = metadata.custom().collect();
    assert_eq!(custom, expected);

    assert_eq!(blob.bytes().await.unwrap(), Bytes::from_static(b"hello world"));
}

#[tokio::test]
async fn test_get_streams_chunks() {
    let (bucket, _store) = media_bucket();
    bucket
        .put("big.bin", reader(&[7u8; 4096]), &Metadata::new())
        .await
        .unwrap();

    let mut blob = bucket.get("big.bin").await.unwrap();
    let mut total = 0;
    while let Some(chunk) = blob.stream.next().await {
        total += chunk.unwrap().len();
    }
    assert_eq!(total, 4096);
}

#[tokio::test]
async fn test_put_overwrites() {
    let (bucket, _store) = media_bucket();
    bucket.put("a.txt", reader(b"one"), &Metadata::new()).await.unwrap();
    bucket.put("a.txt", reader(b"two"), &Metadata::new()).await.unwrap();

    let blob = bucket.get("a.txt").await.unwrap();
    assert_eq!(blob.bytes().await.unwrap(), Bytes::from_static(b"two"));
}

#[tokio::test]
async fn test_remove_is_idempotent() {
    let (bucket, store) = media_bucket();
    bucket.put("gone.txt", reader(b"bye"), &Metadata::new()).await.unwrap();

    bucket.remove("gone.txt").await.unwrap();
    bucket.remove("gone.txt").await.unwrap();

    assert!(store.is_empty());
    assert!(matches!(
        bucket.get("gone.txt").await,
        Err(StorageError::NotFound(key)) if key == "uploads/gone.txt"
    ));
}

#[tokio::test]
async fn test_put_from_file() {
    let (bucket, _store) = media_bucket();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("upload.bin");

    let mut file = tokio::fs::File::create(&path).await.unwrap();
    file.write_all(b"file contents").await.unwrap();
    file.flush().await.unwrap();
    drop(file);

    let file = tokio::fs::File::open(&path).await.unwrap();
    bucket
        .put("upload.bin", Box::pin(file), &Metadata::new())
        .await
        .unwrap();

    let blob = bucket.get("upload.bin").await.unwrap();
    assert_eq!(blob.bytes().await.unwrap(), Bytes::from_static(b"file contents"));
}

#[tokio::test]
async fn test_fresh_client_per_operation() {
    let (bucket, store) = media_bucket();
    bucket.put("a", reader(b"1"), &Metadata::new()).await.unwrap();
    bucket.exists("a").await.unwrap();
    bucket.remove("a").await.unwrap();

    assert_eq!(store.client_count(), 3);
}

#[test]
fn test_public_url_is_template_plus_token() {
    let connection: StorageConnection = "Bucket=media;Path=uploads/;PublicUrl=https://cdn.example.com/uploads/"
        .parse()
        .unwrap();
    let bucket = Bucket::new(connection, Arc::new(MemoryObjectStore::new()));

    assert!(bucket.is_public());
    assert_eq!(
        bucket.public_url("a.jpg?x=1").unwrap(),
        "https://cdn.example.com/uploads/a.jpg?x=1"
    );

    let (private, _) = media_bucket();
    assert!(matches!(
        private.public_url("a.jpg"),
        Err(StorageError::NotSupported(_))
    ));
}
