use axum::extract::State;
use axum::response::Response;
use axum::Json;
use serde_json::{json, Value};

use ordarchive::taxonomy::{catalog, TaxonomyEntry};

use crate::error::ApiError;
use crate::session::see_other;
use crate::state::AppState;

pub async fn health(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let orders = state.intake.count_orders().await?;
    Ok(Json(json!({
        "status": "ok",
        "orders": orders,
        "uptimeSecs": state.started.elapsed().as_secs(),
    })))
}

pub async fn index() -> Response {
    see_other("/api/orders")
}

pub async fn taxonomy() -> Json<Vec<TaxonomyEntry>> {
    Json(catalog())
}
