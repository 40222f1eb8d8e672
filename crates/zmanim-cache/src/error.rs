//! Cache error types.

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Failed to open or lock the backing store.
    #[error("connection error: {0}")]
    Connection(String),

    #[error("migration {name} failed: {reason}")]
    Migration { name: String, reason: String },

    #[error("query error: {0}")]
    Query(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored row could not be decoded.
    #[error("corrupt cache entry {key}: {reason}")]
    Corrupt { key: String, reason: String },
}

pub type Result<T> = std::result::Result<T, CacheError>;

impl CacheError {
    pub fn corrupt(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Corrupt {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` if the error is transient (lock contention, connection).
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connection(_) => true,
            Self::Query(rusqlite::Error::SqliteFailure(e, _)) => matches!(
                e.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ),
            _ => false,
        }
    }
}
