//! Proxy for the platform's object storage. One bucket, opaque byte blobs,
//! one attempt per operation: a failed call surfaces immediately as
//! [`StorageError`] with no retry and no partial-object cleanup beyond what
//! the remote store guarantees.

use reqwest::{header, Client, StatusCode};

use crate::config::Settings;
use crate::error::StorageError;

pub struct ObjectStorage {
    http: Client,
    base_url: String,
    api_key: String,
    bucket: String,
}

/// Effective object path. The owner prefix is the only access-control
/// boundary at this layer; callers are responsible for passing the right
/// owner.
pub fn object_path(name: &str, owner: Option<&str>) -> String {
    match owner {
        Some(owner) => format!("{}/{}", owner, name),
        None => name.to_string(),
    }
}

impl ObjectStorage {
    pub fn new(settings: &Settings) -> Self {
        Self {
            http: Client::new(),
            base_url: settings.supabase_url.trim_end_matches('/').to_string(),
            api_key: settings.supabase_key.clone(),
            bucket: settings.storage_bucket.clone(),
        }
    }

    fn object_url(&self, path: &str) -> String {
        format!("{}/storage/v1/object/{}/{}", self.base_url, self.bucket, path)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
    }

    /// Upload bytes under `{owner}/{name}` (or bare `name` without an
    /// owner) and return the effective path.
    pub async fn upload(
        &self,
        name: &str,
        bytes: Vec<u8>,
        owner: Option<&str>,
    ) -> Result<String, StorageError> {
        let path = object_path(name, owner);
        tracing::info!(path = %path, size = bytes.len(), "uploading object");

        let response = self
            .authorized(self.http.post(self.object_url(&path)))
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .body(bytes)
            .send()
            .await
            .map_err(|e| StorageError::new("Failed to upload file", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::new(
                "Failed to upload file",
                format!("{} {}", status, body),
            ));
        }

        Ok(path)
    }

    /// Fetch one object; `None` when it does not exist (the route layer
    /// turns that into a 404).
    pub async fn download(&self, name: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let response = self
            .authorized(self.http.get(self.object_url(name)))
            .send()
            .await
            .map_err(|e| StorageError::new("Failed to download file", e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(StorageError::new("Failed to download file", status));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| StorageError::new("Failed to download file", e))?;
        Ok(Some(bytes.to_vec()))
    }

    /// Remove one object; true iff it existed.
    pub async fn delete(&self, name: &str) -> Result<bool, StorageError> {
        let response = self
            .authorized(self.http.delete(self.object_url(name)))
            .send()
            .await
            .map_err(|e| StorageError::new("Failed to delete file", e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        if !status.is_success() {
            return Err(StorageError::new("Failed to delete file", status));
        }
        Ok(true)
    }
}
