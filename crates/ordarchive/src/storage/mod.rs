//! Blob store gateway: durable storage for the original scans.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use percent_encoding::percent_decode_str;
use url::Url;

use crate::config::StorageConfig;
use crate::error::{ConfigError, StorageError};
use crate::sanitize::{redact_url, sanitize_file_name};
use crate::secrets::expand_home;

pub mod filesystem;
pub mod supabase;

pub use filesystem::FilesystemStore;
pub use supabase::SupabaseStore;

/// A stored blob: its storage key and the public URL it resolves at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobRef {
    pub key: String,
    pub url: String,
}

/// Storage for uploaded scans.
///
/// URLs returned by `store` must stay publicly resolvable for the life of
/// the object; records keep them indefinitely.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Stores `bytes` under a fresh key derived from `suggested_name`.
    async fn store(
        &self,
        bytes: &[u8],
        suggested_name: &str,
        content_type: &str,
    ) -> Result<BlobRef, StorageError>;

    /// Removes the blob a URL points at.
    async fn remove(&self, url: &str) -> Result<(), StorageError>;

    fn key_from_url(&self, url: &str) -> Result<String, StorageError> {
        key_from_url(url)
    }
}

/// Builds the configured backend.
pub fn from_config(
    config: &StorageConfig,
    request_timeout: Duration,
) -> Result<Arc<dyn BlobStore>, ConfigError> {
    match config {
        StorageConfig::Supabase(supabase) => {
            let api_key = supabase.api_key.resolve().map_err(|e| ConfigError::Secret {
                name: "storage.api_key".to_string(),
                source: e,
            })?;
            let store =
                SupabaseStore::new(&supabase.url, &supabase.bucket, &api_key, request_timeout)
                    .map_err(|e| ConfigError::Validation {
                        message: format!("storage client: {}", e),
                    })?;
            log::info!(
                "Blob storage: Supabase bucket '{}' at {}",
                supabase.bucket,
                redact_url(&supabase.url)
            );
            Ok(Arc::new(store))
        }
        StorageConfig::Filesystem(fs) => {
            let root = expand_home(&fs.root);
            log::info!("Blob storage: directory {}", root);
            Ok(Arc::new(FilesystemStore::new(root, &fs.public_base_url)))
        }
    }
}

/// Builds a storage key unique per upload:
/// `{unix millis}-{8 random hex}-{sanitized name}`.
///
/// The random part keeps two uploads of the same file name within the same
/// millisecond apart.
pub fn blob_key(suggested_name: &str, now: DateTime<Utc>) -> String {
    let nonce = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "{}-{}-{}",
        now.timestamp_millis(),
        &nonce[..8],
        sanitize_file_name(suggested_name)
    )
}

/// Derives the storage key from a blob URL: its final path segment,
/// percent-decoded. Query and fragment are ignored.
pub fn key_from_url(url: &str) -> Result<String, StorageError> {
    let unresolvable = || StorageError::UnresolvableUrl(url.to_string());

    let parsed = Url::parse(url.trim()).map_err(|_| unresolvable())?;
    let segment = parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|s| !s.is_empty())
        .ok_or_else(unresolvable)?;

    decode_key(segment).ok_or_else(unresolvable)
}

/// Percent-decodes a single path segment into a storage key, rejecting
/// anything that could escape the bucket or directory.
pub(crate) fn decode_key(segment: &str) -> Option<String> {
    let key = percent_decode_str(segment).decode_utf8().ok()?.into_owned();
    if key.is_empty() || key == "." || key == ".." || key.contains(['/', '\\']) {
        return None;
    }
    Some(key)
}
