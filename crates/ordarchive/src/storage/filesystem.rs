use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use tokio::io::AsyncWriteExt;

use super::{blob_key, decode_key, key_from_url, BlobRef, BlobStore};
use crate::error::StorageError;

/// Stores blobs as files in one directory, served under `public_base_url`
/// by whatever fronts that directory.
pub struct FilesystemStore {
    root: PathBuf,
    public_base_url: String,
}

impl FilesystemStore {
    pub fn new<P: AsRef<Path>>(root: P, public_base_url: &str) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url, key)
    }

    async fn ensure_directory(&self) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| StorageError::CreateDirectory {
                path: self.root.clone(),
                source: e,
            })
    }

    /// Writes `content` to a file that must not exist yet (O_CREAT | O_EXCL).
    /// A partially written file is removed again.
    async fn write_new(&self, path: &Path, content: &[u8]) -> Result<(), StorageError> {
        let mut file = match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(StorageError::FileExists(path.to_path_buf()));
            }
            Err(e) => {
                return Err(StorageError::WriteFile {
                    path: path.to_path_buf(),
                    source: e,
                });
            }
        };

        let written = async {
            file.write_all(content).await?;
            file.sync_all().await
        }
        .await;

        if let Err(e) = written {
            drop(file);
            let _ = tokio::fs::remove_file(path).await;
            return Err(StorageError::WriteFile {
                path: path.to_path_buf(),
                source: e,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl BlobStore for FilesystemStore {
    fn name(&self) -> &'static str {
        "filesystem"
    }

    async fn store(
        &self,
        bytes: &[u8],
        suggested_name: &str,
        _content_type: &str,
    ) -> Result<BlobRef, StorageError> {
        self.ensure_directory().await?;

        let key = blob_key(suggested_name, Utc::now());
        let path = self.root.join(&key);
        self.write_new(&path, bytes).await.map_err(|e| {
            log::warn!("Failed to store blob at {}: {}", path.display(), e);
            StorageError::UploadFailed {
                key: key.clone(),
                reason: e.to_string(),
            }
        })?;

        log::debug!("Stored {} bytes at {}", bytes.len(), path.display());
        Ok(BlobRef {
            url: self.public_url(&key),
            key,
        })
    }

    async fn remove(&self, url: &str) -> Result<(), StorageError> {
        let key = self.key_from_url(url)?;
        let path = self.root.join(&key);
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| StorageError::RemoveFailed {
                key,
                reason: e.to_string(),
            })
    }

    /// Accepts URLs under `public_base_url`, which may be a bare path such
    /// as `/files`, as well as absolute URLs.
    fn key_from_url(&self, url: &str) -> Result<String, StorageError> {
        let prefix = format!("{}/", self.public_base_url);
        match url.trim().strip_prefix(prefix.as_str()) {
            Some(rest) => {
                let segment = rest.split(['?', '#']).next().unwrap_or_default();
                decode_key(segment).ok_or_else(|| StorageError::UnresolvableUrl(url.to_string()))
            }
            None => key_from_url(url),
        }
    }
}
