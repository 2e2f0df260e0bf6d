pub mod export;
pub mod health;
pub mod wishes;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use wishwall_core::error::WishwallError;

/// HTTP face of [`WishwallError`]: status from the error kind, body carries
/// the same code a WS client would see.
#[derive(Debug)]
pub struct ApiError(pub WishwallError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            WishwallError::MissingFields
            | WishwallError::TooLong { .. }
            | WishwallError::InvalidParams(_) => StatusCode::UNPROCESSABLE_ENTITY,
            WishwallError::AuthFailed(_) => StatusCode::UNAUTHORIZED,
            WishwallError::PermissionDenied { .. } => StatusCode::FORBIDDEN,
            WishwallError::MethodNotFound { .. } => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = json!({
            "error": { "code": self.0.code(), "message": self.0.to_string() }
        });
        (status, Json(body)).into_response()
    }
}

impl<E> From<E> for ApiError
where
    E: Into<WishwallError>,
{
    fn from(e: E) -> Self {
        Self(e.into())
    }
}
