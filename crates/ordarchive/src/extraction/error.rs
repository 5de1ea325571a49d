use std::time::Duration;

use thiserror::Error;

/// Why no extraction result could be produced.
///
/// Every variant is an `ExtractionFailed` outcome for callers: advisory,
/// never blocking the submission it was meant to prefill.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("extraction disabled")]
    Disabled,

    #[error("empty document")]
    EmptyInput,

    #[error("failed to stage document: {0}")]
    Staging(#[source] std::io::Error),

    #[error("file upload failed: {reason}")]
    Upload { reason: String },

    #[error("provider returned {status}: {message}")]
    Provider { status: u16, message: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("extraction timed out after {0:?}")]
    Timeout(Duration),

    #[error("provider returned no text")]
    EmptyResponse,

    #[error("response is not a JSON object: {reason}")]
    InvalidJson { reason: String },
}

impl ExtractionError {
    /// Short reason suitable for logs and advisory notices.
    pub fn reason(&self) -> String {
        self.to_string()
    }
}
