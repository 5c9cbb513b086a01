//! Object-store seam.
//!
//! Everything that talks to the bucket goes through [`ObjectStore`], so the
//! services never see the AWS SDK directly. Production uses [`S3ObjectStore`];
//! tests use [`MemoryObjectStore`].

mod s3;

#[cfg(any(test, feature = "test-utils"))]
mod memory;

use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;
use thiserror::Error;

pub use s3::{S3ObjectStore, S3Settings};

#[cfg(any(test, feature = "test-utils"))]
pub use memory::{MemoryObject, MemoryObjectStore};

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("presigning config rejected: {0}")]
    Config(String),
    #[error("object store request failed: {0}")]
    Upstream(String),
}

pub type ObjectStoreResult<T> = Result<T, ObjectStoreError>;

/// Minimal capability set the image service needs from a bucket.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `body` under `key`, replacing any existing object.
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: Option<&str>,
    ) -> ObjectStoreResult<()>;

    /// Sign a GET request for `key` valid for `expiry`.
    async fn presigned_get_url(
        &self,
        bucket: &str,
        key: &str,
        expiry: Duration,
    ) -> ObjectStoreResult<String>;

    async fn delete(&self, bucket: &str, key: &str) -> ObjectStoreResult<()>;

    /// * `Ok(true)` if the object exists
    /// * `Ok(false)` if the store answered "not found"
    /// * `Err(_)` for anything else
    async fn stat(&self, bucket: &str, key: &str) -> ObjectStoreResult<bool>;

    /// Cheap reachability check used by readiness.
    async fn ping(&self, bucket: &str) -> ObjectStoreResult<()>;
}
