//! S3-compatible HTTP blob store (path-style addressing)

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use tracing::debug;

use super::{BlobStore, StorageError};
use crate::retry::{RetryPolicy, Transient};

/// Blob store speaking plain `GET`/`PUT {endpoint}/{bucket}/{key}`
#[derive(Debug, Clone)]
pub struct HttpBlobStore {
    client: Client,
    endpoint: String,
    token: Option<String>,
    retry: RetryPolicy,
}

impl HttpBlobStore {
    /// Create a new HTTP store
    pub fn new(
        endpoint: &str,
        token: Option<String>,
        retry: RetryPolicy,
    ) -> Result<Self, StorageError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            token,
            retry,
        })
    }

    fn object_url(&self, bucket: &str, key: &str) -> String {
        format!(
            "{}/{}/{}",
            self.endpoint,
            bucket,
            key.trim_start_matches('/')
        )
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn get_once(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        let response = self
            .authorize(self.client.get(self.object_url(bucket, key)))
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(StorageError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            });
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(StorageError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.bytes().await?.to_vec())
    }

    async fn put_once(
        &self,
        bucket: &str,
        key: &str,
        data: &[u8],
        content_type: &str,
    ) -> Result<(), StorageError> {
        let response = self
            .authorize(self.client.put(self.object_url(bucket, key)))
            .header(header::CONTENT_TYPE, content_type)
            .body(data.to_vec())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(StorageError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }

    fn exhausted(&self, e: StorageError) -> StorageError {
        if e.is_transient() {
            StorageError::RetryExhausted {
                attempts: self.retry.attempts(),
                last: e.to_string(),
            }
        } else {
            e
        }
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        let data = self
            .retry
            .run("storage.get", || self.get_once(bucket, key))
            .await
            .map_err(|e| self.exhausted(e))?;
        debug!("Fetched {}/{} ({} bytes)", bucket, key, data.len());
        Ok(data)
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        self.retry
            .run("storage.put", || {
                self.put_once(bucket, key, &data, content_type)
            })
            .await
            .map_err(|e| self.exhausted(e))?;
        debug!("Stored {}/{} ({} bytes)", bucket, key, data.len());
        Ok(())
    }

    fn name(&self) -> &str {
        "http"
    }
}
