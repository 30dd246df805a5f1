//! Storage errors.
//!
//! Anything a backend cannot recover from. Callers surface these as a generic
//! failure and log the detail; they are never turned into empty results.

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Backend-level failure.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("read error: {0}")]
    Read(String),

    #[error("write error: {0}")]
    Write(String),

    #[error("schema error: {0}")]
    Schema(String),

    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("remote error: {0}")]
    Remote(String),

    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

impl StorageError {
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    pub fn read(msg: impl Into<String>) -> Self {
        Self::Read(msg.into())
    }

    pub fn write(msg: impl Into<String>) -> Self {
        Self::Write(msg.into())
    }

    pub fn schema(msg: impl Into<String>) -> Self {
        Self::Schema(msg.into())
    }

    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::Corrupt(msg.into())
    }

    pub fn remote(msg: impl Into<String>) -> Self {
        Self::Remote(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }
}
