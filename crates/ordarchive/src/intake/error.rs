use thiserror::Error;

use crate::db::DatabaseError;
use crate::error::{StorageError, ValidationError};

/// Failures of the intake, update and delete flows.
#[derive(Error, Debug)]
pub enum IntakeError {
    #[error("Invalid submission: {0}")]
    Validation(#[from] ValidationError),

    #[error("Storing the document failed: {0}")]
    UploadFailed(#[source] StorageError),

    #[error("Persistence failed during {op}: {source}")]
    Persistence {
        op: &'static str,
        #[source]
        source: DatabaseError,
    },

    #[error("Order '{id}' not found")]
    NotFound { id: String },
}

impl IntakeError {
    pub fn not_found(id: &str) -> Self {
        Self::NotFound { id: id.to_string() }
    }
}
