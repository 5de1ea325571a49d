//! Prefill endpoint: reads order fields from an uploaded scan.

use axum::extract::{Multipart, State};
use axum::Json;

use ordarchive::intake::Prefill;
use ordarchive::ExtractionResult;

use crate::error::ApiError;
use crate::state::AppState;

pub const FIELD_FILE: &str = "file";

pub async fn parse_pdf(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ExtractionResult>, ApiError> {
    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(FIELD_FILE) {
            let file_name = field.file_name().unwrap_or("document.pdf").to_string();
            let bytes = field.bytes().await?;
            upload = Some((file_name, bytes));
            break;
        }
    }

    let (file_name, bytes) = upload
        .filter(|(_, bytes)| !bytes.is_empty())
        .ok_or(ApiError::FileMissing)?;

    match state.intake.prefill(&bytes, &file_name).await {
        Prefill::Available(result) => Ok(Json(result)),
        Prefill::Unavailable { reason, .. } => Err(ApiError::ExtractionFailed(reason)),
    }
}
