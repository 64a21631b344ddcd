//! Errors raised by the object store.

use thiserror::Error;

pub type StorageResult<T> = Result<T, StorageError>;

/// Failure of a bucket operation or of key/content validation.
///
/// Validation variants (`InvalidKey`, `UnsupportedContentType`,
/// `RangeNotSatisfiable`, `StemInUse`, `NotFound`) are caller errors; the
/// rest come from the backend.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage misconfigured: {0}")]
    Config(String),

    #[error("no object at {0}")]
    NotFound(String),

    #[error("invalid object key: {0}")]
    InvalidKey(String),

    #[error("content type {0} is not accepted here")]
    UnsupportedContentType(String),

    #[error("range cannot be served for {0}")]
    RangeNotSatisfiable(String),

    #[error("{key} shares its file name stem with {existing}")]
    StemInUse { key: String, existing: String },

    #[error("write to bucket failed: {0}")]
    Write(String),

    #[error("read from bucket failed: {0}")]
    Read(String),

    #[error("delete from bucket failed: {0}")]
    Delete(String),

    #[error("bucket listing failed: {0}")]
    List(String),

    #[error("bucket unreachable: {0}")]
    Unavailable(String),
}

impl StorageError {
    pub fn missing_var(name: &str) -> Self {
        Self::Config(format!("{} is not set", name))
    }

    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound(key.into())
    }

    pub fn invalid_key(msg: impl Into<String>) -> Self {
        Self::InvalidKey(msg.into())
    }

    /// True for errors caused by the request rather than the backend.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_)
                | Self::InvalidKey(_)
                | Self::UnsupportedContentType(_)
                | Self::RangeNotSatisfiable(_)
                | Self::StemInUse { .. }
        )
    }
}
