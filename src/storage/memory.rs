//! In-memory blob store

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{BlobStore, StorageError};

/// An object held by `MemoryBlobStore`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub data: Vec<u8>,
    pub content_type: String,
}

/// Process-local blob store; nothing survives a restart
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    objects: RwLock<HashMap<(String, String), StoredObject>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object without going through the async interface
    pub fn insert(&self, bucket: &str, key: &str, data: Vec<u8>, content_type: &str) {
        self.objects.write().insert(
            (bucket.to_string(), normalize(key)),
            StoredObject {
                data,
                content_type: content_type.to_string(),
            },
        );
    }

    /// Sorted keys currently stored in `bucket`
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .objects
            .read()
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Look up a stored object
    pub fn object(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        self.objects
            .read()
            .get(&(bucket.to_string(), normalize(key)))
            .cloned()
    }
}

fn normalize(key: &str) -> String {
    key.trim_start_matches('/').to_string()
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        self.object(bucket, key)
            .map(|o| o.data)
            .ok_or_else(|| StorageError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        if normalize(key).is_empty() {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        self.insert(bucket, key, data, content_type);
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
