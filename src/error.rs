use thiserror::Error;

/// Failures raised by a trade store adapter. The engine passes these through
/// unchanged; retry policy belongs to the adapter.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Corrupt trade record {id}: {reason}")]
    Corrupt { id: String, reason: String },

    #[error("Trade store unavailable: {0}")]
    Unavailable(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("Trade store error: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid trade date: {0:?} (expected YYYY-MM-DD)")]
    InvalidTradeDate(String),

    #[error("Unknown date range preset: {0}")]
    InvalidPreset(String),

    #[error("Analytics task failed: {0}")]
    Task(String),
}

impl From<tokio::task::JoinError> for AnalyticsError {
    fn from(err: tokio::task::JoinError) -> Self {
        AnalyticsError::Task(err.to_string())
    }
}
