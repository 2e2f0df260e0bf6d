use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use std::sync::Arc;
use wishwall_store::PublicWish;

use crate::app::AppState;
use crate::http::ApiError;

/// Body of `POST /wishes`. Missing fields deserialize as empty and are then
/// rejected by validation, so the client gets `MISSING_FIELDS`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitBody {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub wish: String,
    #[serde(default)]
    pub created_at_ms: Option<i64>,
}

/// POST /wishes: submit from a plain form post.
pub async fn submit_wish(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SubmitBody>,
) -> Result<(StatusCode, Json<PublicWish>), ApiError> {
    let record = state.submit_wish(&body.name, &body.wish, body.created_at_ms)?;
    Ok((StatusCode::CREATED, Json(record.public())))
}

/// GET /wishes: public projection, newest first. Never includes wish text.
pub async fn list_wishes(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<PublicWish>>, ApiError> {
    let snapshot = state.store.snapshot()?;
    Ok(Json(snapshot.public()))
}
