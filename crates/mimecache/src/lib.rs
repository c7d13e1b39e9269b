//! Reader for the shared-mime-info binary cache (`mime.cache`).
//!
//! The cache is the compiled form of the freedesktop glob, magic, alias and
//! subclass rules. This crate keeps the whole file in one owned buffer and
//! answers queries by following the integer offsets stored inside it:
//!
//! - **Filename globs** ([`MimeCache::glob_candidates`]): literal names,
//!   reverse suffix tree, then wildcard patterns, short-circuiting at the
//!   first strategy with a result
//! - **Weights** ([`MimeCache::glob_mime_types`]): highest weight, then
//!   longest pattern
//! - **Magic** ([`MimeCache::magic_mime_types`]): prioritised byte-range
//!   matchlet trees, in on-disk order
//! - **Hierarchy** ([`MimeCache::unalias`], [`MimeCache::is_equal_or_subclass`])
//!
//! A [`MimeCache`] is immutable once loaded and can be shared between threads
//! behind an [`Arc`](std::sync::Arc).
//!
//! The `mock` feature exposes [`mock::MockCache`], which serialises rule sets
//! into the binary format for tests.

pub mod error;
mod glob;
mod hierarchy;
mod magic;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
mod store;
mod suffix;
mod weight;

pub use crate::weight::WeightedMime;
use derive_more::Display;

/// Media type returned when nothing more specific is known.
pub const OCTET_STREAM: &str = "application/octet-stream";
/// Media type returned for content that decodes as text.
pub const TEXT_PLAIN: &str = "text/plain";

/// One of the six sub-tables addressed by the cache header.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
pub enum Table {
    #[display("alias")]
    Alias,
    #[display("parent")]
    Parent,
    #[display("literal")]
    Literal,
    #[display("reverse suffix tree")]
    ReverseSuffixTree,
    #[display("glob")]
    Glob,
    #[display("magic")]
    Magic,
}

impl Table {
    /// Every table, in header order.
    pub const ALL: [Table; 6] = [
        Table::Alias,
        Table::Parent,
        Table::Literal,
        Table::ReverseSuffixTree,
        Table::Glob,
        Table::Magic,
    ];

    /// Position of this table's offset inside the header.
    #[inline]
    #[must_use]
    pub fn header_position(&self) -> u32 {
        match self {
            Table::Alias => 4,
            Table::Parent => 8,
            Table::Literal => 12,
            Table::ReverseSuffixTree => 16,
            Table::Glob => 20,
            Table::Magic => 24,
        }
    }

    #[inline]
    pub(crate) const fn slot(&self) -> usize {
        match self {
            Table::Alias => 0,
            Table::Parent => 1,
            Table::Literal => 2,
            Table::ReverseSuffixTree => 3,
            Table::Glob => 4,
            Table::Magic => 5,
        }
    }
}

/// An immutable, loaded `mime.cache`.
///
/// All "pointers" between tables are plain offsets into `data`; nothing
/// borrows into the buffer beyond the lifetime of a single query.
#[derive(Clone)]
pub struct MimeCache {
    data: Vec<u8>,
    tables: [u32; 6],
}

impl std::fmt::Debug for MimeCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MimeCache")
            .field("size", &self.data.len())
            .field("tables", &self.tables)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::{MimeCache, Table};
    use rstest::rstest;

    #[rstest]
    #[case(Table::Alias, 4)]
    #[case(Table::Parent, 8)]
    #[case(Table::Literal, 12)]
    #[case(Table::ReverseSuffixTree, 16)]
    #[case(Table::Glob, 20)]
    #[case(Table::Magic, 24)]
    fn test_header_position(#[case] table: Table, #[case] expected: u32) {
        assert_eq!(table.header_position(), expected);
    }

    #[test]
    fn cache_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<MimeCache>();
    }
}
