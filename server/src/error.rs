//! HTTP mapping of archive failures.

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use ordarchive::intake::IntakeError;
use ordarchive::ArchiveError;

pub const MSG_WRONG_PASSWORD: &str = "Неверный пароль";
pub const MSG_FILE_MISSING: &str = "Файл не найден";
pub const MSG_EXTRACTION_FAILED: &str = "Не удалось распознать документ";

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldBody>,
}

#[derive(Debug, Serialize)]
pub struct FieldBody {
    pub field: &'static str,
    pub reason: String,
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Intake(#[from] IntakeError),

    #[error("wrong password")]
    WrongPassword,

    #[error("no file in request")]
    FileMissing,

    #[error("extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("malformed form: {0}")]
    Multipart(#[from] MultipartError),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Intake(IntakeError::Validation(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Intake(IntakeError::NotFound { .. }) => StatusCode::NOT_FOUND,
            ApiError::Intake(IntakeError::UploadFailed(_)) => StatusCode::BAD_GATEWAY,
            ApiError::Intake(IntakeError::Persistence { .. }) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::WrongPassword => StatusCode::UNAUTHORIZED,
            ApiError::FileMissing | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::ExtractionFailed(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::Multipart(e) => e.status(),
        }
    }

    fn body(&self) -> ErrorBody {
        let (error, fields) = match self {
            ApiError::Intake(IntakeError::Validation(e)) => (
                e.to_string(),
                e.issues
                    .iter()
                    .map(|i| FieldBody {
                        field: i.field,
                        reason: i.reason.clone(),
                    })
                    .collect(),
            ),
            ApiError::Intake(IntakeError::Persistence { .. }) | ApiError::Internal(_) => {
                ("Internal error".to_string(), Vec::new())
            }
            ApiError::WrongPassword => (MSG_WRONG_PASSWORD.to_string(), Vec::new()),
            ApiError::FileMissing => (MSG_FILE_MISSING.to_string(), Vec::new()),
            ApiError::ExtractionFailed(_) => (MSG_EXTRACTION_FAILED.to_string(), Vec::new()),
            other => (other.to_string(), Vec::new()),
        };
        ErrorBody { error, fields }
    }
}

/// Failures that stop the server process.
#[derive(Error, Debug)]
pub enum ServeError {
    #[error("startup failed: {0}")]
    Startup(#[from] ArchiveError),

    #[error("failed to install log bridge: {0}")]
    LogBridge(#[from] log::SetLoggerError),

    #[error("failed to install tracing subscriber: {0}")]
    Subscriber(#[from] tracing::subscriber::SetGlobalDefaultError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Server(#[source] std::io::Error),

    #[error("server task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "request rejected");
        }
        (status, Json(self.body())).into_response()
    }
}
