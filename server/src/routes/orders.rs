//! Archive record endpoints.

use axum::extract::{Multipart, Path, Query, Request, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use ordarchive::intake::DeleteOutcome;
use ordarchive::{ArchiveRecord, OrderFilter};

use super::form::{read_order_form, read_order_multipart};
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub q: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteQuery {
    pub pdf_url: Option<String>,
}

pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<ArchiveRecord>>, ApiError> {
    let filter = OrderFilter { query: query.q };
    let listing = state.intake.list_orders(&filter).await?;
    Ok(Json(listing.to_vec()))
}

pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ArchiveRecord>, ApiError> {
    Ok(Json(state.intake.get_order(&id).await?))
}

pub async fn create_order(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ArchiveRecord>), ApiError> {
    let input = read_order_multipart(multipart).await?;
    let record = state.intake.add_order(input).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn update_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
    request: Request,
) -> Result<Json<ArchiveRecord>, ApiError> {
    let input = read_order_form(request).await?;
    Ok(Json(state.intake.update_order(&id, &input).await?))
}

pub async fn delete_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<DeleteQuery>,
) -> Result<Json<DeleteOutcome>, ApiError> {
    let outcome = state
        .intake
        .delete_order(&id, query.pdf_url.as_deref())
        .await?;
    Ok(Json(outcome))
}
