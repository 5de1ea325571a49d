//! Order intake: validation, blob storage and persistence of archive records,
//! plus the update, delete, listing and prefill flows around them.

pub mod config;
pub mod context;
pub mod error;
pub mod service;
pub mod state;

pub use config::IntakeSettings;
pub use context::IntakeContext;
pub use error::IntakeError;
pub use service::{DeleteOutcome, IntakeService, Prefill, ReconcileReport, PREFILL_UNAVAILABLE_NOTICE};
pub use state::IntakeState;
