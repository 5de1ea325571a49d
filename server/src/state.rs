//! Shared state for request handlers.

use std::sync::Arc;
use std::time::Instant;

use ordarchive::config::{database_path, Config, StorageConfig};
use ordarchive::intake::{IntakeService, IntakeSettings};
use ordarchive::{extraction, storage, Database, OrderEventBroadcaster, SessionGate};

/// Where the filesystem backend's directory is served from, if this server
/// serves it.
#[derive(Debug, Clone)]
pub struct ServedFiles {
    pub mount: String,
    pub root: String,
}

#[derive(Clone)]
pub struct AppState {
    pub intake: IntakeService,
    pub gate: Arc<SessionGate>,
    /// Request body ceiling: the upload limit plus room for form fields.
    pub body_limit: usize,
    pub files: Option<ServedFiles>,
    pub started: Instant,
}

/// Slack on top of `max_upload_bytes` for multipart framing and text fields.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

impl AppState {
    pub fn new(intake: IntakeService, gate: SessionGate) -> Self {
        let body_limit = intake.settings().max_upload_bytes + FORM_OVERHEAD_BYTES;
        Self {
            intake,
            gate: Arc::new(gate),
            body_limit,
            files: None,
            started: Instant::now(),
        }
    }

    pub fn with_served_files(mut self, files: Option<ServedFiles>) -> Self {
        self.files = files;
        self
    }

    /// Wires every collaborator from configuration.
    pub fn from_config(config: &Config) -> ordarchive::Result<Self> {
        let settings = IntakeSettings::from_config(config);

        let db = Database::open(&database_path(config)?)?;
        let blobs = storage::from_config(&config.storage, settings.upload_timeout)?;
        let extractor = extraction::from_config(&config.extraction)?;
        let gate = SessionGate::from_config(&config.auth)?;

        let intake = IntakeService::new(
            db,
            blobs,
            extractor,
            OrderEventBroadcaster::default(),
            settings,
        );
        Ok(Self::new(intake, gate).with_served_files(served_files(&config.storage)))
    }
}

/// A filesystem backend with a path-only public URL is served by this
/// process under that path.
fn served_files(storage: &StorageConfig) -> Option<ServedFiles> {
    match storage {
        StorageConfig::Filesystem(fs) if fs.public_base_url.trim_end_matches('/').starts_with('/') => {
            Some(ServedFiles {
                mount: fs.public_base_url.trim_end_matches('/').to_string(),
                root: ordarchive::secrets::expand_home(&fs.root),
            })
        }
        _ => None,
    }
}
