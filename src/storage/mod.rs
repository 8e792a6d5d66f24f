//! Object storage gateway
//!
//! Provides:
//! - `BlobStore` trait with get/put by bucket and key
//! - Filesystem, HTTP (S3-compatible, path-style) and in-memory backends
//! - `s3://` URI parsing and random artifact naming

mod fs;
mod http;
mod memory;

pub use fs::FsBlobStore;
pub use http::HttpBlobStore;
pub use memory::{MemoryBlobStore, StoredObject};

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::retry::{RetryPolicy, Transient};

/// Content type for generated images
pub const PNG_CONTENT_TYPE: &str = "image/png";

/// Content type for email payloads
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object not found: {bucket}/{key}")]
    NotFound { bucket: String, key: String },

    #[error("invalid object key: {0:?}")]
    InvalidKey(String),

    #[error("invalid object URI {uri:?}: {reason}")]
    InvalidUri { uri: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("storage API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("all {attempts} storage attempts failed, last error: {last}")]
    RetryExhausted { attempts: usize, last: String },
}

impl Transient for StorageError {
    fn is_transient(&self) -> bool {
        match self {
            StorageError::Http(e) => {
                e.is_connect() || e.is_timeout() || e.is_request() || e.is_body()
            }
            StorageError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Binary object storage addressed by bucket and key
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Fetch an object's bytes
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Store an object, replacing any existing one
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError>;

    /// Backend name for logging and health reports
    fn name(&self) -> &str;
}

/// Storage backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Local directory, one sub-directory per bucket
    #[default]
    Fs,
    /// S3-compatible HTTP endpoint
    Http,
    /// Process-local map (tests and dry runs)
    Memory,
}

/// Storage configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Root directory for the `fs` backend
    pub root: String,
    /// Base URL for the `http` backend
    pub endpoint: String,
    /// Bearer token for the `http` backend
    pub token: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Fs,
            root: "./data".to_string(),
            endpoint: "http://127.0.0.1:9000".to_string(),
            token: None,
        }
    }
}

/// Build the configured blob store
pub fn open(
    config: &StorageConfig,
    retry: RetryPolicy,
) -> Result<Arc<dyn BlobStore>, StorageError> {
    let store: Arc<dyn BlobStore> = match config.backend {
        StorageBackend::Fs => Arc::new(FsBlobStore::new(&config.root)),
        StorageBackend::Http => Arc::new(HttpBlobStore::new(
            &config.endpoint,
            config.token.clone(),
            retry,
        )?),
        StorageBackend::Memory => Arc::new(MemoryBlobStore::new()),
    };
    Ok(store)
}

/// A parsed `s3://bucket/key` location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectUri {
    pub bucket: String,
    pub key: String,
}

impl ObjectUri {
    /// Parse an `s3://bucket/key` URI
    pub fn parse(uri: &str) -> Result<Self, StorageError> {
        let invalid = |reason: &str| StorageError::InvalidUri {
            uri: uri.to_string(),
            reason: reason.to_string(),
        };

        let parsed = Url::parse(uri).map_err(|e| invalid(&e.to_string()))?;
        if parsed.scheme() != "s3" {
            return Err(invalid("scheme must be s3"));
        }

        let bucket = parsed
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| invalid("missing bucket"))?
            .to_string();

        // Url::path() percent-encodes; object keys are taken verbatim
        let raw_key = uri
            .split_once("://")
            .and_then(|(_, rest)| rest.split_once('/'))
            .map(|(_, key)| key)
            .unwrap_or_default();
        let key = raw_key.trim_start_matches('/').to_string();
        if key.is_empty() {
            return Err(invalid("missing object key"));
        }

        Ok(Self { bucket, key })
    }
}

impl std::fmt::Display for ObjectUri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

/// Generate a fresh artifact key: `<prefix><uuid-v4>.<extension>`
pub fn generate_key(prefix: &str, extension: &str) -> String {
    format!("{}{}.{}", prefix, uuid::Uuid::new_v4(), extension)
}
