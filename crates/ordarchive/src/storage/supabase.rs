//! Supabase Storage backend (REST API).

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use secrecy::{ExposeSecret, SecretString};

use super::{blob_key, key_from_url, BlobRef, BlobStore};
use crate::error::StorageError;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Blobs in a public Supabase Storage bucket.
#[derive(Debug, Clone)]
pub struct SupabaseStore {
    client: reqwest::Client,
    base_url: String,
    bucket: String,
}

impl SupabaseStore {
    /// `base_url` is the project URL (`https://<ref>.supabase.co`); `api_key`
    /// needs write access to `bucket`.
    pub fn new(
        base_url: &str,
        bucket: &str,
        api_key: &SecretString,
        request_timeout: Duration,
    ) -> Result<Self, StorageError> {
        let invalid = |reason: String| StorageError::UploadFailed {
            key: String::new(),
            reason,
        };

        let mut headers = HeaderMap::new();
        let mut bearer =
            HeaderValue::from_str(&format!("Bearer {}", api_key.expose_secret()))
                .map_err(|e| invalid(format!("invalid API key header value: {}", e)))?;
        bearer.set_sensitive(true);
        let mut apikey = HeaderValue::from_str(api_key.expose_secret())
            .map_err(|e| invalid(format!("invalid API key header value: {}", e)))?;
        apikey.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);
        headers.insert("apikey", apikey);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(request_timeout)
            .build()
            .map_err(|e| invalid(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            bucket: bucket.to_string(),
        })
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/storage/v1/object/{}/{}", self.base_url, self.bucket, key)
    }

    pub fn public_url(&self, key: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, self.bucket, key
        )
    }
}

#[async_trait]
impl BlobStore for SupabaseStore {
    fn name(&self) -> &'static str {
        "supabase"
    }

    async fn store(
        &self,
        bytes: &[u8],
        suggested_name: &str,
        content_type: &str,
    ) -> Result<BlobRef, StorageError> {
        let key = blob_key(suggested_name, Utc::now());
        let failed = |reason: String| StorageError::UploadFailed {
            key: key.clone(),
            reason,
        };

        let response = self
            .client
            .post(self.object_url(&key))
            .header(CONTENT_TYPE, content_type)
            .header("x-upsert", "false")
            .header("cache-control", "max-age=3600")
            .body(bytes.to_vec())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    failed("request timed out".to_string())
                } else {
                    failed(format!("HTTP request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::warn!("Supabase upload of {} returned {}: {}", key, status, body);
            return Err(failed(format!("storage returned {}: {}", status, body)));
        }

        log::debug!("Uploaded {} ({} bytes) to bucket {}", key, bytes.len(), self.bucket);
        Ok(BlobRef {
            url: self.public_url(&key),
            key,
        })
    }

    async fn remove(&self, url: &str) -> Result<(), StorageError> {
        let key = key_from_url(url)?;

        let response = self
            .client
            .delete(self.object_url(&key))
            .send()
            .await
            .map_err(|e| StorageError::RemoveFailed {
                key: key.clone(),
                reason: format!("HTTP request failed: {}", e),
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(StorageError::RemoveFailed {
            key,
            reason: format!("storage returned {}: {}", status, body),
        })
    }
}
