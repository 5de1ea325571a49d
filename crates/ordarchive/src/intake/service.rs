use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::broadcast::{OrderEvent, OrderEventBroadcaster, OrderEventKind};
use crate::db::order_repo::{self, OrderRow};
use crate::db::orphan_repo::{self, OrphanRow};
use crate::db::{Database, DatabaseError};
use crate::document;
use crate::error::StorageError;
use crate::extraction::{DocumentExtractor, ExtractionError, ExtractionResult};
use crate::listing_cache::{Listing, ListingCache};
use crate::record::{ArchiveRecord, OrderFilter, OrderInput};
use crate::storage::{BlobRef, BlobStore};
use crate::validation::{validate_for_create, validate_for_update};

use super::config::IntakeSettings;
use super::context::IntakeContext;
use super::error::IntakeError;
use super::state::IntakeState;

/// Shown when no prefill could be produced.
pub const PREFILL_UNAVAILABLE_NOTICE: &str =
    "Не удалось распознать документ автоматически, заполните поля вручную";

/// Outcome of a prefill request. Never an error: extraction is advisory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prefill {
    Available(ExtractionResult),
    Unavailable { notice: String, reason: String },
}

/// What happened on delete besides the record removal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOutcome {
    pub id: String,
    pub blob_removed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blob_error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    pub attempted: usize,
    pub removed: usize,
    pub remaining: usize,
}

/// Use-case layer for archive records: intake, update, delete, listing and
/// prefill. Cheap to clone; all handles are shared.
#[derive(Clone)]
pub struct IntakeService {
    db: Database,
    blobs: Arc<dyn BlobStore>,
    extractor: Arc<dyn DocumentExtractor>,
    cache: ListingCache,
    events: OrderEventBroadcaster,
    settings: Arc<IntakeSettings>,
}

impl IntakeService {
    pub fn new(
        db: Database,
        blobs: Arc<dyn BlobStore>,
        extractor: Arc<dyn DocumentExtractor>,
        events: OrderEventBroadcaster,
        settings: IntakeSettings,
    ) -> Self {
        let cache = ListingCache::new(settings.list_cache_capacity, settings.list_cache_ttl);
        Self {
            db,
            blobs,
            extractor,
            cache,
            events,
            settings: Arc::new(settings),
        }
    }

    pub fn events(&self) -> &OrderEventBroadcaster {
        &self.events
    }

    pub fn settings(&self) -> &IntakeSettings {
        &self.settings
    }

    /// Validates, stores the scan, then persists the record.
    ///
    /// Nothing is persisted unless the blob is stored. If persisting fails
    /// the blob is removed again; when that fails too its key goes to the
    /// orphan ledger for [`IntakeService::reconcile_orphans`].
    pub async fn add_order(&self, input: OrderInput) -> Result<ArchiveRecord, IntakeError> {
        let submission_id = uuid::Uuid::new_v4().to_string();
        let file_name = input
            .file
            .as_ref()
            .map(|f| f.file_name.clone())
            .unwrap_or_default();
        let span = info_span!("add_order", submission = %submission_id);

        async move {
            let mut ctx = IntakeContext::new(submission_id, &file_name);

            let submission = match validate_for_create(input, self.settings.max_upload_bytes) {
                Ok(s) => s,
                Err(e) => {
                    ctx.advance(IntakeState::RejectedInvalid);
                    return Err(IntakeError::Validation(e));
                }
            };
            ctx.advance(IntakeState::Validated);

            let file = submission.file;
            if let Some(pages) = document::page_count(&file.bytes) {
                debug!(pages, size = file.len(), "scan inspected");
            }
            let content_type = document::content_type_for(&file.file_name, file.content_type.as_deref());

            let blob = match self.store_blob(&file.bytes, &file.file_name, &content_type).await {
                Ok(blob) => blob,
                Err(e) => {
                    ctx.advance(IntakeState::RejectedUploadFailed);
                    return Err(IntakeError::UploadFailed(e));
                }
            };
            ctx.blob = Some(blob.clone());
            ctx.advance(IntakeState::BlobStored);

            let row = OrderRow::new(
                uuid::Uuid::new_v4().to_string(),
                &submission.record,
                blob.url.clone(),
                Utc::now(),
            );
            let persisted = self
                .run_db("insert", move |db| {
                    order_repo::insert(db, &row)?;
                    row.into_record()
                })
                .await;

            let record = match persisted {
                Ok(record) => record,
                Err(e) => {
                    ctx.advance(IntakeState::RejectedPersistFailed);
                    self.release_orphan(&blob, &e.to_string()).await;
                    return Err(e);
                }
            };
            ctx.advance(IntakeState::Persisted);

            self.changed(OrderEventKind::Created, &record.id, Some(&record.order_number));
            info!(order = %record.id, number = %record.order_number, "order archived");
            Ok(record)
        }
        .instrument(span)
        .await
    }

    /// Overwrites an order's metadata. The stored scan and its URL never
    /// change; a `pdf_url` in the input is ignored.
    pub async fn update_order(
        &self,
        id: &str,
        input: &OrderInput,
    ) -> Result<ArchiveRecord, IntakeError> {
        let record = validate_for_update(input)?;
        if input.pdf_url.is_some() {
            debug!(order = %id, "ignoring pdfUrl on update");
        }

        let owned_id = id.to_string();
        let updated = self
            .run_db("update", move |db| {
                order_repo::update_metadata(db, &owned_id, &record, Utc::now())?
                    .map(OrderRow::into_record)
                    .transpose()
            })
            .await?
            .ok_or_else(|| IntakeError::not_found(id))?;

        self.changed(OrderEventKind::Updated, &updated.id, Some(&updated.order_number));
        info!(order = %id, "order updated");
        Ok(updated)
    }

    /// Removes the scan (best effort), then the record.
    ///
    /// The stored record's URL decides which blob is removed; a differing
    /// `pdf_url` from the caller is only logged.
    pub async fn delete_order(
        &self,
        id: &str,
        pdf_url: Option<&str>,
    ) -> Result<DeleteOutcome, IntakeError> {
        let owned_id = id.to_string();
        let existing = self
            .run_db("lookup", move |db| order_repo::find_by_id(db, &owned_id))
            .await?
            .ok_or_else(|| IntakeError::not_found(id))?;

        if let Some(supplied) = pdf_url.filter(|u| *u != existing.pdf_url) {
            warn!(order = %id, supplied = %supplied, "delete request carried a different pdfUrl; using the stored one");
        }

        let blob_error = match self.remove_blob(&existing.pdf_url).await {
            Ok(()) => None,
            Err(e) => {
                warn!(order = %id, error = %e, "blob removal failed; deleting record anyway");
                Some(e.to_string())
            }
        };

        let owned_id = id.to_string();
        let deleted = self
            .run_db("delete", move |db| order_repo::delete(db, &owned_id))
            .await?;
        if !deleted {
            return Err(IntakeError::not_found(id));
        }

        self.changed(OrderEventKind::Deleted, id, Some(&existing.order_number));
        info!(order = %id, "order deleted");
        Ok(DeleteOutcome {
            id: id.to_string(),
            blob_removed: blob_error.is_none(),
            blob_error,
        })
    }

    pub async fn get_order(&self, id: &str) -> Result<ArchiveRecord, IntakeError> {
        let owned_id = id.to_string();
        self.run_db("lookup", move |db| {
            order_repo::find_by_id(db, &owned_id)?
                .map(OrderRow::into_record)
                .transpose()
        })
        .await?
        .ok_or_else(|| IntakeError::not_found(id))
    }

    /// Orders newest first, narrowed by `filter`. Served from the listing
    /// cache when possible.
    pub async fn list_orders(&self, filter: &OrderFilter) -> Result<Listing, IntakeError> {
        if let Some(hit) = self.cache.get(filter) {
            debug!(query = ?filter.term(), "listing cache hit");
            return Ok(hit);
        }

        let generation = self.cache.generation();
        let owned_filter = filter.clone();
        let records = self
            .run_db("list", move |db| {
                order_repo::query(db, &owned_filter)?
                    .into_iter()
                    .map(OrderRow::into_record)
                    .collect::<Result<Vec<_>, _>>()
            })
            .await?;

        let listing = Arc::new(records);
        self.cache.insert(generation, filter, Arc::clone(&listing));
        Ok(listing)
    }

    pub async fn count_orders(&self) -> Result<u64, IntakeError> {
        self.run_db("count", order_repo::count).await
    }

    /// Reads order fields from a scan to prefill the submission form.
    pub async fn prefill(&self, bytes: &[u8], file_name: &str) -> Prefill {
        let span = info_span!("prefill", extractor = self.extractor.name(), size = bytes.len());
        let outcome = tokio::time::timeout(
            self.settings.prefill_timeout,
            self.extractor.extract(bytes, file_name),
        )
        .instrument(span)
        .await
        .unwrap_or(Err(ExtractionError::Timeout(self.settings.prefill_timeout)));

        match outcome {
            Ok(result) => {
                info!(fields = result.filled_fields(), "prefill available");
                Prefill::Available(result)
            }
            Err(e) => {
                warn!(reason = %e, "prefill unavailable");
                Prefill::Unavailable {
                    notice: PREFILL_UNAVAILABLE_NOTICE.to_string(),
                    reason: e.reason(),
                }
            }
        }
    }

    /// Retries removal of every blob in the orphan ledger.
    pub async fn reconcile_orphans(&self) -> Result<ReconcileReport, IntakeError> {
        let orphans = self.run_db("list_orphans", orphan_repo::list).await?;
        let mut report = ReconcileReport {
            attempted: orphans.len(),
            ..Default::default()
        };

        for orphan in orphans {
            match self.remove_blob(&orphan.blob_url).await {
                Ok(()) => {
                    let key = orphan.blob_key.clone();
                    self.run_db("forget_orphan", move |db| orphan_repo::remove(db, &key))
                        .await?;
                    report.removed += 1;
                    info!(key = %orphan.blob_key, "orphaned blob removed");
                }
                Err(e) => {
                    report.remaining += 1;
                    warn!(key = %orphan.blob_key, error = %e, "orphaned blob still present");
                }
            }
        }

        if report.attempted > 0 {
            info!(
                attempted = report.attempted,
                removed = report.removed,
                remaining = report.remaining,
                "orphan reconciliation finished"
            );
        }
        Ok(report)
    }

    async fn store_blob(
        &self,
        bytes: &[u8],
        file_name: &str,
        content_type: &str,
    ) -> Result<BlobRef, StorageError> {
        with_timeout(
            self.settings.upload_timeout,
            self.blobs.store(bytes, file_name, content_type),
        )
        .await
    }

    async fn remove_blob(&self, url: &str) -> Result<(), StorageError> {
        with_timeout(self.settings.upload_timeout, self.blobs.remove(url)).await
    }

    /// Cleans up after a blob whose record could not be persisted.
    async fn release_orphan(&self, blob: &BlobRef, reason: &str) {
        match self.remove_blob(&blob.url).await {
            Ok(()) => info!(key = %blob.key, "removed blob of unpersisted order"),
            Err(remove_err) => {
                warn!(key = %blob.key, error = %remove_err, "blob of unpersisted order left behind");
                let orphan = OrphanRow::new(&blob.key, &blob.url, reason, Utc::now());
                if let Err(e) = self
                    .run_db("record_orphan", move |db| orphan_repo::record(db, &orphan))
                    .await
                {
                    error!(key = %blob.key, url = %blob.url, error = %e, "orphaned blob not recorded; remove it manually");
                }
            }
        }
    }

    fn changed(&self, kind: OrderEventKind, id: &str, order_number: Option<&str>) {
        self.cache.invalidate();
        self.events.send(OrderEvent::new(kind, id, order_number));
    }

    /// Runs a repository call on the blocking pool.
    async fn run_db<T, F>(&self, op: &'static str, f: F) -> Result<T, IntakeError>
    where
        F: FnOnce(&Database) -> Result<T, DatabaseError> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| DatabaseError::TaskFailed(e.to_string()))
            .and_then(|result| result)
            .map_err(|source| IntakeError::Persistence { op, source })
    }
}

async fn with_timeout<T>(
    limit: Duration,
    fut: impl std::future::Future<Output = Result<T, StorageError>>,
) -> Result<T, StorageError> {
    tokio::time::timeout(limit, fut)
        .await
        .unwrap_or(Err(StorageError::Timeout(limit)))
}
