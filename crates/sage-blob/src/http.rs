//! HTTP object-store implementation.
//!
//! Speaks a minimal protocol to a hosted blob service:
//!
//! - `PUT {base}/{path}` with the raw bytes; the response body carries
//!   the durable URL as JSON.
//! - `DELETE {url}` removes a blob by its durable URL.
//! - `GET {base}?prefix={prefix}` lists blobs as a JSON array.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{BlobError, Result};
use crate::{BlobInfo, ObjectStore};

/// Response body of a successful upload.
#[derive(Debug, Deserialize)]
struct PutResponse {
    url: String,
}

/// Response body of a listing.
#[derive(Debug, Deserialize)]
struct ListResponse {
    blobs: Vec<BlobInfo>,
}

/// Client for a hosted blob service over HTTP.
pub struct HttpObjectStore {
    base_url: String,
    client: reqwest::Client,
}

impl HttpObjectStore {
    /// Create a new client against the given base URL.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created (should never happen
    /// with default TLS).
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to create HTTP client");

        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }

        Self { base_url, client }
    }

    /// The configured base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn check_status(status: reqwest::StatusCode) -> Result<()> {
        if status.is_success() {
            Ok(())
        } else {
            Err(BlobError::Status(status.as_u16()))
        }
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn put(&self, path: &str, bytes: Vec<u8>) -> Result<String> {
        let url = format!("{}/{path}", self.base_url);

        let response = self
            .client
            .put(&url)
            .body(bytes)
            .send()
            .await
            .map_err(|e| BlobError::Request(e.to_string()))?;

        Self::check_status(response.status())?;

        let body: PutResponse = response
            .json()
            .await
            .map_err(|e| BlobError::Request(format!("invalid response: {e}")))?;

        Ok(body.url)
    }

    async fn delete(&self, url: &str) -> Result<()> {
        if !url.starts_with(&self.base_url) {
            return Err(BlobError::InvalidUrl(url.to_string()));
        }

        let response = self
            .client
            .delete(url)
            .send()
            .await
            .map_err(|e| BlobError::Request(e.to_string()))?;

        Self::check_status(response.status())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<BlobInfo>> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("prefix", prefix)])
            .send()
            .await
            .map_err(|e| BlobError::Request(e.to_string()))?;

        Self::check_status(response.status())?;

        let body: ListResponse = response
            .json()
            .await
            .map_err(|e| BlobError::Request(format!("invalid response: {e}")))?;

        Ok(body.blobs)
    }
}
