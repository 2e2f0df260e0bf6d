use thiserror::Error;

#[derive(Debug, Error)]
pub enum WishwallError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    #[error("WebSocket protocol error: {0}")]
    Protocol(String),

    #[error("Method not found: {method}")]
    MethodNotFound { method: String },

    #[error("Permission denied: {reason}")]
    PermissionDenied { reason: String },

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Please fill in both name and wish")]
    MissingFields,

    #[error("{field} is too long (max {max} characters)")]
    TooLong { field: &'static str, max: usize },

    #[error("Store error: {0}")]
    Store(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl WishwallError {
    /// Short error code string sent to clients in WS RES frames.
    pub fn code(&self) -> &'static str {
        match self {
            WishwallError::Config(_) => "CONFIG_ERROR",
            WishwallError::AuthFailed(_) => "AUTH_FAILED",
            WishwallError::Protocol(_) => "PROTOCOL_ERROR",
            WishwallError::MethodNotFound { .. } => "METHOD_NOT_FOUND",
            WishwallError::PermissionDenied { .. } => "PERMISSION_DENIED",
            WishwallError::InvalidParams(_) => "INVALID_PARAMS",
            WishwallError::MissingFields => "MISSING_FIELDS",
            WishwallError::TooLong { .. } => "TOO_LONG",
            WishwallError::Store(_) => "STORE_ERROR",
            WishwallError::Serialization(_) => "SERIALIZATION_ERROR",
            WishwallError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, WishwallError>;
