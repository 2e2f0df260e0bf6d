use thiserror::Error;

/// Errors that can occur during wish store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Name or wish was empty after trimming. Nothing was written.
    #[error("Please fill in both name and wish")]
    MissingFields,

    /// A submitted field exceeds its length cap. Nothing was written.
    #[error("{field} is too long (max {max} characters)")]
    TooLong { field: &'static str, max: usize },

    /// A SQLite operation failed.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Export serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<StoreError> for wishwall_core::error::WishwallError {
    fn from(e: StoreError) -> Self {
        use wishwall_core::error::WishwallError;
        match e {
            StoreError::MissingFields => WishwallError::MissingFields,
            StoreError::TooLong { field, max } => WishwallError::TooLong { field, max },
            StoreError::Database(e) => WishwallError::Store(e.to_string()),
            StoreError::Serialization(e) => WishwallError::Serialization(e),
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
