use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::info;
use wishwall_core::error::WishwallError;
use wishwall_store::export;

use crate::app::AppState;
use crate::http::ApiError;

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

/// GET /admin/export: full record list as a JSON download.
///
/// Requires `Authorization: Bearer <session token>` from an admin login.
pub async fn export_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let token = bearer(&headers)
        .ok_or_else(|| WishwallError::AuthFailed("missing bearer token".to_string()))?;
    if !state.auth.validate(token) {
        return Err(WishwallError::AuthFailed("invalid or expired session".to_string()).into());
    }

    let snapshot = state.store.snapshot()?;
    let body = export::to_json(&snapshot.records)?;
    let filename = export::filename(chrono::Utc::now());
    info!(count = snapshot.len(), %filename, "export served");

    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{filename}\""))
        .map_err(|e| WishwallError::Internal(e.to_string()))?;
    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/json")),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use crate::app::{build_router, testing::{test_state, ADMIN_PASSWORD}};
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use serde_json::Value;
    use tower::ServiceExt;

    fn export_request(token: Option<&str>) -> Request<Body> {
        let mut req = Request::builder().uri("/admin/export");
        if let Some(t) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {t}"));
        }
        req.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn export_requires_session() {
        let app = build_router(test_state());
        let res = app.clone().oneshot(export_request(None)).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let res = app.oneshot(export_request(Some("forged"))).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn export_is_a_json_download_with_wish_text() {
        let state = test_state();
        state.submit_wish("Anna", "Dancing Queen", Some(300)).unwrap();
        state.submit_wish("Bo", "Waterloo", Some(200)).unwrap();
        let token = state.auth.login(ADMIN_PASSWORD).unwrap();

        let res = build_router(state)
            .oneshot(export_request(Some(&token)))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let disposition = res.headers()[header::CONTENT_DISPOSITION].to_str().unwrap().to_string();
        assert!(disposition.starts_with("attachment; filename=\"wishwall_"));
        assert!(disposition.ends_with(".json\""));

        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let entries: Value = serde_json::from_slice(&bytes).unwrap();
        let entries = entries.as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["name"], "Anna");
        assert_eq!(entries[0]["wish"], "Dancing Queen");
        assert!(entries[0]["createdAt"].as_str().unwrap().ends_with('Z'));
    }
}
