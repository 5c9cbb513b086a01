//! In-process `ObjectStore` used by tests.

use super::{ObjectStore, ObjectStoreError, ObjectStoreResult};
use async_trait::async_trait;
use bytes::Bytes;
use std::{
    collections::HashMap,
    sync::{
        Mutex,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    time::Duration,
};

/// A stored payload plus the content type it was uploaded with.
#[derive(Clone, Debug)]
pub struct MemoryObject {
    pub body: Bytes,
    pub content_type: Option<String>,
}

/// Keeps objects in a map and signs URLs with a monotonically increasing
/// counter, so two signatures for the same key never match.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: Mutex<HashMap<(String, String), MemoryObject>>,
    signatures: AtomicU64,
    unavailable: AtomicBool,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail as if the endpoint were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<MemoryObject> {
        self.lock()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.lock()
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<(String, String), MemoryObject>> {
        self.objects
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_available(&self) -> ObjectStoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(ObjectStoreError::Upstream("connection refused".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: Option<&str>,
    ) -> ObjectStoreResult<()> {
        self.check_available()?;
        self.lock().insert(
            (bucket.to_string(), key.to_string()),
            MemoryObject {
                body,
                content_type: content_type.map(str::to_string),
            },
        );
        Ok(())
    }

    async fn presigned_get_url(
        &self,
        bucket: &str,
        key: &str,
        expiry: Duration,
    ) -> ObjectStoreResult<String> {
        self.check_available()?;
        let signature = self.signatures.fetch_add(1, Ordering::SeqCst);
        Ok(format!(
            "http://memory.test/{}/{}?X-Amz-Expires={}&X-Amz-Signature={:016x}",
            bucket,
            key,
            expiry.as_secs(),
            signature
        ))
    }

    async fn delete(&self, bucket: &str, key: &str) -> ObjectStoreResult<()> {
        self.check_available()?;
        self.lock().remove(&(bucket.to_string(), key.to_string()));
        Ok(())
    }

    async fn stat(&self, bucket: &str, key: &str) -> ObjectStoreResult<bool> {
        self.check_available()?;
        Ok(self
            .lock()
            .contains_key(&(bucket.to_string(), key.to_string())))
    }

    async fn ping(&self, _bucket: &str) -> ObjectStoreResult<()> {
        self.check_available()
    }
}
