//! Detection Error Types
//!
//! Detection itself never fails. The only errors are a byte source that
//! could not deliver, and a database that could not be loaded.

use derive_more::{Display, Error};
use mimer_cache::error::{Error as CacheError, ErrorKind as CacheErrorKind};

/// A detection error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for detection operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The content bytes were needed but the byte source failed. The cause is
    /// attached as a child of the error tree.
    #[display("failed to get bytes")]
    GetBytes,
    /// The MIME database could not be loaded.
    #[display("database error: {_0}")]
    Database(CacheErrorKind),
}

impl ErrorKind {
    /// Convert a cache error into a detection error, preserving the cache
    /// crate's `Exn` frame as a child in its own error tree.
    #[track_caller]
    pub fn database(err: CacheError) -> Error {
        let inner = (*err).clone();
        err.raise(ErrorKind::Database(inner))
    }

    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::GetBytes => true,
            Self::Database(kind) => kind.is_retryable(),
        }
    }
}
