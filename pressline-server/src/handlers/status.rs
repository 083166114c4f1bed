use axum::{Json, extract::State};
use serde_json::{Value, json};

use crate::AppState;

/// `GET /api/status` — liveness and board-auth probe polled by the UI.
pub async fn status(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "ok": true,
        "board_authenticated": state.credentials.is_authenticated(),
    }))
}
