//! The S3 blob backend against a MinIO container. Needs Docker.

use std::sync::Arc;
use std::time::Duration;

use ::common::storage::{
    BlobKey, BlobStore, BoxReader, DOCUMENT_PREFIX, StorageError, open_blob_store,
};
use docstore_server::config::ConsistencyConfig;
use docstore_server::documents::{DocumentService, UploadRequest};
use docstore_server::store::MemoryMetadataStore;

use crate::common::{TestApp, UploadForm, fresh_minio_storage, routes};

async fn minio_store(max_blob_size: u64) -> Arc<dyn BlobStore> {
    let storage = fresh_minio_storage(max_blob_size).await;
    open_blob_store(&storage)
        .await
        .expect("Failed to open S3 blob store")
}

fn reader(bytes: &[u8]) -> BoxReader {
    Box::new(std::io::Cursor::new(bytes.to_vec()))
}

#[tokio::test]
async fn put_get_round_trip() {
    let store = minio_store(1024 * 1024).await;

    let (key, written) = store
        .upload(reader(b"hello minio"), "hello.txt", "text/plain")
        .await
        .unwrap();

    assert_eq!(written, 11);
    assert!(store.exists(&key).await.unwrap());
    assert_eq!(store.get(&key).await.unwrap(), b"hello minio");
}

#[tokio::test]
async fn missing_blob_is_not_found() {
    let store = minio_store(1024).await;
    let key = BlobKey::generate("missing.txt");

    assert!(matches!(
        store.get_stream(&key).await,
        Err(StorageError::NotFound(_))
    ));
    assert!(!store.exists(&key).await.unwrap());
}

#[tokio::test]
async fn delete_twice_succeeds() {
    let store = minio_store(1024).await;
    let (key, _) = store
        .upload(reader(b"bye"), "bye.txt", "text/plain")
        .await
        .unwrap();

    assert!(store.delete(&key).await.is_ok());
    assert!(store.delete(&key).await.is_ok());
    assert!(!store.exists(&key).await.unwrap());
}

#[tokio::test]
async fn oversized_put_leaves_no_object() {
    let store = minio_store(10).await;
    let key = BlobKey::generate("big.bin");

    let result = store
        .put_stream(
            &key,
            reader(b"this is more than ten bytes"),
            "application/octet-stream",
        )
        .await;

    assert!(matches!(
        result,
        Err(StorageError::SizeLimitExceeded { limit: 10, .. })
    ));
    assert!(!store.exists(&key).await.unwrap());
}

#[tokio::test]
async fn presigned_url_serves_the_blob() {
    let store = minio_store(1024).await;
    let (key, _) = store
        .upload(reader(b"signed bytes"), "signed.txt", "text/plain")
        .await
        .unwrap();

    let url = store
        .presigned_get_url(&key, Duration::from_secs(300))
        .await
        .unwrap();
    assert!(url.contains("X-Amz-Signature"), "{url}");

    let res = reqwest::get(&url).await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.bytes().await.unwrap().as_ref(), b"signed bytes");
}

#[tokio::test]
async fn list_feeds_the_orphan_sweep() {
    let store = minio_store(1024).await;
    let service = DocumentService::new(
        store.clone(),
        Arc::new(MemoryMetadataStore::new()),
        ConsistencyConfig::default(),
    );

    let record = service
        .upload(
            reader(b"kept"),
            4,
            UploadRequest {
                file_name: "kept.txt".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let orphan = BlobKey::generate("orphan.txt");
    store.put(&orphan, b"orphan", "text/plain").await.unwrap();

    let listed = store.list(&format!("{DOCUMENT_PREFIX}/")).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert!(listed.iter().any(|e| e.key == orphan && e.size == 6));

    // S3 timestamps have second precision.
    tokio::time::sleep(Duration::from_millis(1100)).await;

    assert_eq!(service.sweep_orphans(Duration::ZERO).await.unwrap(), 1);
    assert!(!store.exists(&orphan).await.unwrap());
    let kept = BlobKey::parse(record.blob_key).unwrap();
    assert!(store.exists(&kept).await.unwrap());
}

#[tokio::test]
async fn http_round_trip_over_s3() {
    let app = TestApp::spawn_with_s3().await;

    let created = app
        .upload(UploadForm::file("report.pdf", b"%PDF-1.7").content_type("application/pdf"))
        .await;
    assert_eq!(created.status, 201, "{}", created.text);
    let id = created.id();

    let download = app.get(&routes::download(&id)).await;
    assert_eq!(download.status, 200);
    assert_eq!(download.bytes, b"%PDF-1.7");

    let link = app.get(&routes::download_url(&id)).await;
    assert_eq!(link.status, 200, "{}", link.text);
    assert!(link.body["url"].as_str().unwrap().starts_with("http://"));

    assert_eq!(app.delete(&routes::document(&id)).await.status, 204);
    assert_eq!(app.get(&routes::download(&id)).await.status, 404);
}
