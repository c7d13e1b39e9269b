//! Configuration Error Types

use derive_more::{Display, Error};

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// A configuration source could not be parsed. Fix the file or variable.
    #[display("invalid configuration: {_0}")]
    Invalid(#[error(not(source))] String),
    /// No database was configured and none of the search paths exist.
    /// Install shared-mime-info or set an explicit database path.
    #[display("no MIME database found")]
    DatabaseNotFound,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
