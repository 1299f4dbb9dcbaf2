//! In-memory blob store

use async_trait::async_trait;
use chrono::Utc;
use dashmap::{DashMap, DashSet};
use std::time::Duration;

use crate::domain::value_objects::AttachmentRef;
use crate::ports::outbound::{AttachmentStore, SignedUrl, StorageError};

#[derive(Clone, Debug)]
struct StoredObject {
    bytes: Vec<u8>,
    content_type: String,
}

/// Blob store keyed by path. Paths registered with `fail_deletes_for`
/// reject deletion, which lets callers exercise partial-failure handling.
pub struct InMemoryAttachmentStore {
    objects: DashMap<String, StoredObject>,
    failing_deletes: DashSet<String>,
    base_url: String,
    max_bytes: usize,
}

impl InMemoryAttachmentStore {
    pub fn new(max_bytes: usize) -> Self {
        Self {
            objects: DashMap::new(),
            failing_deletes: DashSet::new(),
            base_url: "memory://attachments".into(),
            max_bytes,
        }
    }

    pub fn contains(&self, path: &AttachmentRef) -> bool {
        self.objects.contains_key(path.as_str())
    }

    pub fn content_type(&self, path: &AttachmentRef) -> Option<String> {
        self.objects.get(path.as_str()).map(|o| o.content_type.clone())
    }

    pub fn size(&self, path: &AttachmentRef) -> Option<usize> {
        self.objects.get(path.as_str()).map(|o| o.bytes.len())
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn fail_deletes_for(&self, path: &AttachmentRef) {
        self.failing_deletes.insert(path.as_str().to_string());
    }

    pub fn heal(&self, path: &AttachmentRef) {
        self.failing_deletes.remove(path.as_str());
    }
}

impl Default for InMemoryAttachmentStore {
    fn default() -> Self {
        Self::new(10 * 1024 * 1024)
    }
}

#[async_trait]
impl AttachmentStore for InMemoryAttachmentStore {
    async fn upload(&self, path: &AttachmentRef, bytes: Vec<u8>, content_type: &str) -> Result<(), StorageError> {
        if bytes.len() > self.max_bytes {
            return Err(StorageError::TooLarge { size: bytes.len(), limit: self.max_bytes });
        }
        self.objects.insert(
            path.as_str().to_string(),
            StoredObject { bytes, content_type: content_type.to_string() },
        );
        Ok(())
    }

    async fn signed_url(&self, path: &AttachmentRef, ttl: Duration) -> Result<SignedUrl, StorageError> {
        if !self.objects.contains_key(path.as_str()) {
            return Err(StorageError::NotFound(path.to_string()));
        }
        let ttl = chrono::Duration::from_std(ttl).map_err(|e| StorageError::Backend(e.to_string()))?;
        let expires_at = Utc::now() + ttl;
        Ok(SignedUrl {
            url: format!("{}/{}?expires={}", self.base_url, path, expires_at.timestamp()),
            expires_at,
        })
    }

    async fn delete(&self, path: &AttachmentRef) -> Result<(), StorageError> {
        if self.failing_deletes.contains(path.as_str()) {
            return Err(StorageError::Backend(format!("delete rejected for {path}")));
        }
        self.objects.remove(path.as_str());
        Ok(())
    }
}
