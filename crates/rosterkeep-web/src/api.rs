//! Route handlers.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Serialize;

use rosterkeep_store::HistoryDocument;

use crate::state::AppState;

// ---------------------------------------------------------------------------
// GET /healthz
// ---------------------------------------------------------------------------

/// Response payload for the `/healthz` endpoint.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Liveness probe. Does not touch either store.
pub async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// ---------------------------------------------------------------------------
// GET /history
// ---------------------------------------------------------------------------

/// Return the current history, `{}` when nothing has been saved.
pub async fn get_history(State(state): State<Arc<AppState>>) -> Json<HistoryDocument> {
    Json(state.history.read().await)
}

// ---------------------------------------------------------------------------
// POST /save-history
// ---------------------------------------------------------------------------

/// Persist the posted history document.
///
/// Responds 500 only when the durable write fails; a cache failure is
/// logged by the store and otherwise ignored.
pub async fn save_history(
    State(state): State<Arc<AppState>>,
    Json(doc): Json<HistoryDocument>,
) -> (StatusCode, &'static str) {
    match state.history.save(&doc).await {
        Ok(outcome) => {
            tracing::debug!(cache = %outcome.cache, entries = doc.len(), "history save complete");
            (StatusCode::OK, "Saved")
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to save history");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to save history.json")
        }
    }
}
