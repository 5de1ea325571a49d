//! Isolated intake environment for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use ordarchive::db::Database;
use ordarchive::extraction::{DisabledExtractor, DocumentExtractor};
use ordarchive::intake::{IntakeService, IntakeSettings};
use ordarchive::storage::{blob_key, key_from_url, BlobRef, BlobStore};
use ordarchive::{OrderEventBroadcaster, StorageError};

pub const BLOB_BASE_URL: &str = "https://blobs.test/storage/v1/object/public/orders";

/// Blob store kept in a map. Store and remove failures can be toggled.
#[derive(Default)]
pub struct MemoryStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
    fail_store: AtomicBool,
    fail_remove: AtomicBool,
    store_calls: AtomicUsize,
    remove_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn fail_store(&self, fail: bool) {
        self.fail_store.store(fail, Ordering::SeqCst);
    }

    pub fn fail_remove(&self, fail: bool) {
        self.fail_remove.store(fail, Ordering::SeqCst);
    }

    pub fn store_calls(&self) -> usize {
        self.store_calls.load(Ordering::SeqCst)
    }

    pub fn remove_calls(&self) -> usize {
        self.remove_calls.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.blobs.lock().unwrap().len()
    }

    pub fn contains_url(&self, url: &str) -> bool {
        let key = key_from_url(url).unwrap();
        self.blobs.lock().unwrap().contains_key(&key)
    }

    /// Removes a blob behind the service's back.
    pub fn evict(&self, url: &str) {
        let key = key_from_url(url).unwrap();
        self.blobs.lock().unwrap().remove(&key);
    }
}

#[async_trait]
impl BlobStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn store(
        &self,
        bytes: &[u8],
        suggested_name: &str,
        _content_type: &str,
    ) -> Result<BlobRef, StorageError> {
        self.store_calls.fetch_add(1, Ordering::SeqCst);
        let key = blob_key(suggested_name, Utc::now());
        if self.fail_store.load(Ordering::SeqCst) {
            return Err(StorageError::UploadFailed {
                key,
                reason: "injected failure".to_string(),
            });
        }
        self.blobs.lock().unwrap().insert(key.clone(), bytes.to_vec());
        Ok(BlobRef {
            url: format!("{}/{}", BLOB_BASE_URL, key),
            key,
        })
    }

    async fn remove(&self, url: &str) -> Result<(), StorageError> {
        self.remove_calls.fetch_add(1, Ordering::SeqCst);
        let key = key_from_url(url)?;
        if self.fail_remove.load(Ordering::SeqCst) {
            return Err(StorageError::RemoveFailed {
                key,
                reason: "injected failure".to_string(),
            });
        }
        match self.blobs.lock().unwrap().remove(&key) {
            Some(_) => Ok(()),
            None => Err(StorageError::RemoveFailed {
                key,
                reason: "object not found".to_string(),
            }),
        }
    }
}

/// An intake service wired to in-memory collaborators.
pub struct TestHarness {
    pub db: Database,
    pub blobs: Arc<MemoryStore>,
    pub service: IntakeService,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_extractor(Arc::new(DisabledExtractor))
    }

    pub fn with_extractor(extractor: Arc<dyn DocumentExtractor>) -> Self {
        let db = Database::open_in_memory().expect("Failed to open in-memory database");
        let blobs = Arc::new(MemoryStore::default());
        let settings = IntakeSettings {
            max_upload_bytes: 1024 * 1024,
            upload_timeout: Duration::from_secs(5),
            prefill_timeout: Duration::from_secs(5),
            ..IntakeSettings::default()
        };
        let service = IntakeService::new(
            db.clone(),
            blobs.clone(),
            extractor,
            OrderEventBroadcaster::new(16),
            settings,
        );
        Self { db, blobs, service }
    }

    /// Makes every subsequent order insert fail at the database.
    pub fn break_orders_table(&self) {
        self.db
            .with_conn(|conn| {
                conn.execute_batch("DROP TABLE orders")?;
                Ok(())
            })
            .expect("Failed to drop orders table");
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
