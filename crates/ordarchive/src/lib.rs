pub mod auth;
pub mod broadcast;
pub mod config;
pub mod db;
pub mod document;
pub mod error;
pub mod extraction;
pub mod intake;
pub mod listing_cache;
pub mod record;
pub mod sanitize;
pub mod secrets;
pub mod storage;
pub mod taxonomy;
pub mod validation;

pub use auth::{SessionCookie, SessionGate};
pub use broadcast::{OrderEvent, OrderEventBroadcaster, OrderEventKind};
pub use config::{load_config, Config};
pub use db::{Database, DatabaseError};
pub use error::{ArchiveError, ConfigError, FieldIssue, Result, StorageError, ValidationError};
pub use extraction::{DocumentExtractor, ExtractionError, ExtractionResult};
pub use intake::{DeleteOutcome, IntakeError, IntakeService, IntakeSettings, Prefill};
pub use record::{ArchiveRecord, OrderFilter, OrderInput, UploadedFile};
pub use secrets::{resolve_secret, SecretError, SecretSource, TokenCipher};
pub use storage::{BlobRef, BlobStore};
pub use taxonomy::OrderType;
