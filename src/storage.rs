//! Object storage for uploaded media. S3 in production; any S3-compatible endpoint (MinIO) via `S3_ENDPOINT`.

use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use std::future::Future;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("object upload failed for {key}: {reason}")]
    Upload { key: String, reason: String },
    #[error("object delete failed for {key}: {reason}")]
    Delete { key: String, reason: String },
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn put_object(&self, key: &str, data: Vec<u8>, content_type: Option<&str>) -> Result<(), StorageError>;
    async fn delete_object(&self, key: &str) -> Result<(), StorageError>;
}

/// Upload `data` under `key`, then run `commit`. When `commit` fails the object is deleted again.
pub async fn put_then_commit<T, E, F>(
    storage: &dyn ObjectStorage,
    key: &str,
    data: Vec<u8>,
    content_type: Option<&str>,
    commit: F,
) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: From<StorageError>,
{
    storage.put_object(key, data, content_type).await?;
    match commit.await {
        Ok(value) => Ok(value),
        Err(err) => {
            if let Err(cleanup) = storage.delete_object(key).await {
                tracing::warn!(error = %cleanup, "orphaned object left behind");
            }
            Err(err)
        }
    }
}

#[derive(Clone)]
pub struct S3Storage {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3Storage {
    pub fn new(client: aws_sdk_s3::Client, bucket: impl Into<String>) -> Self {
        S3Storage {
            client,
            bucket: bucket.into(),
        }
    }

    /// Build a client from the default AWS credential chain. A custom endpoint switches to path-style addressing.
    pub async fn from_env(bucket: impl Into<String>, endpoint: Option<&str>) -> Self {
        let shared = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let mut builder = aws_sdk_s3::config::Builder::from(&shared);
        if let Some(url) = endpoint {
            builder = builder.endpoint_url(url).force_path_style(true);
        }
        let client = aws_sdk_s3::Client::from_conf(builder.build());
        S3Storage::new(client, bucket)
    }
}

#[async_trait]
impl ObjectStorage for S3Storage {
    async fn put_object(&self, key: &str, data: Vec<u8>, content_type: Option<&str>) -> Result<(), StorageError> {
        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data));
        if let Some(content_type) = content_type {
            request = request.content_type(content_type);
        }
        request.send().await.map_err(|e| StorageError::Upload {
            key: key.to_string(),
            reason: DisplayErrorContext(&e).to_string(),
        })?;
        tracing::debug!("stored object {} in bucket {}", key, self.bucket);
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> Result<(), StorageError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::Delete {
                key: key.to_string(),
                reason: DisplayErrorContext(&e).to_string(),
            })?;
        Ok(())
    }
}

/// Object key for a student image: `images/<school>/<image id>[.<ext>]`, extension taken from the uploaded file name.
pub fn image_object_key(school_id: uuid::Uuid, image_id: uuid::Uuid, file_name: Option<&str>) -> String {
    let extension = file_name
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()));
    match extension {
        Some(ext) => format!("images/{}/{}.{}", school_id, image_id, ext),
        None => format!("images/{}/{}", school_id, image_id),
    }
}
