use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::app::AppState;

/// GET /health: liveness probe, returns server metadata.
///
/// `templates` is the number of templates currently on disk, or `null` when
/// the directory cannot be read.
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let templates = state.sessions.templates().list().ok().map(|t| t.len());
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "templates": templates,
    }))
}
