//! Cache Error Types
//!
//! Every error in this crate is a load-time fault: once a [`MimeCache`](crate::MimeCache)
//! has been constructed, queries against it cannot fail.

use crate::Table;
use derive_more::{Display, Error};
use std::path::PathBuf;

/// A cache error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for cache operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The cache file does not exist. Install shared-mime-info or point the
    /// configuration at another file.
    #[display("cache file not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// Reading the cache file failed.
    #[display("I/O error")]
    Io,
    /// The file is a cache of a format this crate does not understand.
    #[display("unsupported cache version {major}.{minor}")]
    UnsupportedVersion { major: u16, minor: u16 },
    /// The header or a table points outside of the file. Regenerate the cache.
    #[display("truncated {_0} table")]
    Truncated(#[error(not(source))] Table),
    /// The file is too short to contain a header.
    #[display("truncated header")]
    TruncatedHeader,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Io)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exn::ResultExt;

    #[test]
    fn error_kind_display() {
        assert_eq!(ErrorKind::Truncated(Table::Magic).to_string(), "truncated magic table");
        assert_eq!(
            ErrorKind::UnsupportedVersion { major: 2, minor: 0 }.to_string(),
            "unsupported cache version 2.0"
        );
        assert_eq!(
            ErrorKind::NotFound(PathBuf::from("/nowhere/mime.cache")).to_string(),
            "cache file not found: /nowhere/mime.cache"
        );
    }

    #[test]
    fn error_kind_retryable() {
        assert!(ErrorKind::Io.is_retryable());
        assert!(!ErrorKind::TruncatedHeader.is_retryable());
        assert!(!ErrorKind::Truncated(Table::Alias).is_retryable());
    }

    #[test]
    fn error_from_result() {
        let result: std::result::Result<(), std::io::Error> =
            Err(std::io::Error::new(std::io::ErrorKind::InvalidData, "short read"));
        let err: Result<()> = result.or_raise(|| ErrorKind::Io);
        assert_eq!(*err.unwrap_err(), ErrorKind::Io);
    }
}
