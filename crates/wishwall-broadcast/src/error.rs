use thiserror::Error;

/// Errors raised by persisted-state operations.
///
/// Live-channel problems never surface here: a missing or receiver-less
/// channel is a normal, silent condition.
#[derive(Debug, Error)]
pub enum BroadcastError {
    /// Underlying SQLite error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A value could not be encoded for persistence.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<BroadcastError> for wishwall_core::error::WishwallError {
    fn from(e: BroadcastError) -> Self {
        use wishwall_core::error::WishwallError;
        match e {
            BroadcastError::Database(e) => WishwallError::Store(e.to_string()),
            BroadcastError::Serialization(e) => WishwallError::Serialization(e),
        }
    }
}

pub type Result<T> = std::result::Result<T, BroadcastError>;
