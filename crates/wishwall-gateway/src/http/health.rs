use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::app::AppState;

/// GET /health: liveness check, returns server metadata.
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    // a failing store still answers, with no count
    let wishes = state.store.snapshot().ok().map(|s| s.len());
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "protocol": wishwall_core::config::PROTOCOL_VERSION,
        "ws_clients": state.ws_clients.len(),
        "wishes": wishes,
    }))
}
