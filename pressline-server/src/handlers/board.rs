use axum::{Json, extract::State};
use serde_json::{Value, json};
use tracing::warn;

use pressline_core::BoardError;

use crate::AppState;
use crate::errors::{AppError, AppResult};

/// `GET /api/board` — the cached, normalized board snapshot.
///
/// Served straight from [`pressline_core::BoardSyncCache`]; concurrent
/// dashboard loads coalesce onto a single upstream fetch.
pub async fn get_board(State(state): State<AppState>) -> AppResult<Json<Value>> {
    if !state.credentials.is_authenticated() {
        return Err(AppError::unauthorized(
            "Not authenticated with the board provider",
        ));
    }

    match state.board_cache.get().await {
        Ok(snapshot) => Ok(Json(json!({ "boards": [snapshot.as_ref()] }))),
        Err(err) => {
            warn!(error = %err, "board fetch failed");
            Err(match err.as_ref() {
                BoardError::NotAuthenticated => AppError::unauthorized(
                    "Not authenticated with the board provider",
                ),
                _ => AppError::internal("Failed to fetch board"),
            })
        }
    }
}
