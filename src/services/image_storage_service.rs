//! ImageStorageService — turns uploads into stored objects and stored objects
//! into presigned URLs.
//!
//! Keys are `<uuid-v4><extension>`; the extension is taken from the last `.`
//! of the uploaded file's base name. Nothing is cached and nothing is retried:
//! each URL request re-signs, each store failure is returned as-is, wrapped
//! with the operation that failed.

use crate::services::object_store::{ObjectStore, ObjectStoreError};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::{sync::Arc, time::Duration};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Default (and maximum) lifetime of a presigned GET URL: 7 days.
pub const DEFAULT_URL_EXPIRY: Duration = Duration::from_secs(7 * 24 * 60 * 60);

#[derive(Debug, Error)]
pub enum ImageStorageError {
    #[error("file `{0}` has no extension")]
    MissingExtension(String),
    #[error("Failed to upload image: {0}")]
    Upload(#[source] ObjectStoreError),
    #[error("Failed to generate public URL: {0}")]
    Presign(#[source] ObjectStoreError),
    #[error("Failed to delete image: {0}")]
    Delete(#[source] ObjectStoreError),
}

pub type ImageStorageResult<T> = Result<T, ImageStorageError>;

/// A file received from a client, fully buffered.
#[derive(Clone, Debug)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// Presigned URL with expiration information.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PresignedUrl {
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

/// Result of a successful upload: where the object lives and how to reach it.
#[derive(Clone, Debug)]
pub struct StoredImage {
    pub key: String,
    pub url: PresignedUrl,
}

/// Outcome of an existence check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ObjectPresence {
    Found,
    NotFound,
    /// The store could not answer; the object may or may not exist.
    Unavailable(String),
}

#[derive(Clone)]
pub struct ImageStorageService {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    url_expiry: Duration,
}

impl ImageStorageService {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        bucket: impl Into<String>,
        url_expiry: Duration,
    ) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            url_expiry,
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Store an uploaded file under a fresh key and sign a URL for it.
    ///
    /// The URL's lifetime starts when it is signed, right after the put.
    pub async fn upload_image(&self, file: UploadedFile) -> ImageStorageResult<StoredImage> {
        let key = generate_key(&file.file_name)?;
        let size = file.data.len();

        self.store
            .put(&self.bucket, &key, file.data, file.content_type.as_deref())
            .await
            .map_err(|err| {
                error!("upload of `{}` as {} failed: {}", file.file_name, key, err);
                ImageStorageError::Upload(err)
            })?;

        info!(
            "Stored `{}` as {}/{} ({} bytes)",
            file.file_name, self.bucket, key, size
        );

        let url = self.generate_public_url(&key).await?;
        Ok(StoredImage { key, url })
    }

    /// Sign a fresh GET URL for `key`. Every call signs again.
    pub async fn generate_public_url(&self, key: &str) -> ImageStorageResult<PresignedUrl> {
        let signed_at = Utc::now();
        let url = self
            .store
            .presigned_get_url(&self.bucket, key, self.url_expiry)
            .await
            .map_err(|err| {
                error!("presigning {} failed: {}", key, err);
                ImageStorageError::Presign(err)
            })?;

        debug!("Signed URL for {} valid for {:?}", key, self.url_expiry);
        Ok(PresignedUrl {
            url,
            expires_at: signed_at + self.url_expiry,
        })
    }

    /// Delete `key` unconditionally. Whether an absent key is an error is up
    /// to the store.
    pub async fn delete_image(&self, key: &str) -> ImageStorageResult<()> {
        self.store
            .delete(&self.bucket, key)
            .await
            .map_err(ImageStorageError::Delete)?;
        info!("Deleted {}/{}", self.bucket, key);
        Ok(())
    }

    pub async fn image_exists(&self, key: &str) -> ObjectPresence {
        match self.store.stat(&self.bucket, key).await {
            Ok(true) => ObjectPresence::Found,
            Ok(false) => ObjectPresence::NotFound,
            Err(err) => {
                warn!("existence check for {} failed: {}", key, err);
                ObjectPresence::Unavailable(err.to_string())
            }
        }
    }

    /// Reachability of the configured bucket.
    pub async fn ping(&self) -> Result<(), ObjectStoreError> {
        self.store.ping(&self.bucket).await
    }
}

/// Everything from the last `.` of the base name, dot included.
fn file_extension(file_name: &str) -> Option<&str> {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    base.rfind('.').map(|pos| &base[pos..])
}

fn generate_key(file_name: &str) -> ImageStorageResult<String> {
    let extension = file_extension(file_name)
        .ok_or_else(|| ImageStorageError::MissingExtension(file_name.to_string()))?;
    Ok(format!("{}{}", Uuid::new_v4(), extension))
}
