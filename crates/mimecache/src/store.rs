//! Loading and primitive decoding of the cache buffer.
//!
//! All integers are big-endian `u32`s. Strings are NUL-terminated and read
//! in place.

use crate::error::{ErrorKind, Result};
use crate::{MimeCache, Table};
use exn::ResultExt;
use memchr::memchr;
use std::borrow::Cow;
use std::cmp::Ordering;
use std::path::Path;
use tracing::instrument;

/// Major version, minor version, then six table offsets.
const HEADER_LEN: usize = 28;
const SUPPORTED_MAJOR_VERSION: u16 = 1;

impl MimeCache {
    /// Load a cache from its raw bytes, validating the header and the extent
    /// of every fixed-stride table.
    #[instrument(skip(data), fields(size = data.len()))]
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        if data.len() < HEADER_LEN {
            exn::bail!(ErrorKind::TruncatedHeader);
        }
        let major = u16::from_be_bytes([data[0], data[1]]);
        let minor = u16::from_be_bytes([data[2], data[3]]);
        if major != SUPPORTED_MAJOR_VERSION {
            exn::bail!(ErrorKind::UnsupportedVersion { major, minor });
        }

        let mut cache = Self { data, tables: [0; 6] };
        for table in Table::ALL {
            cache.tables[table.slot()] = cache.read_u32(table.header_position());
        }
        for table in Table::ALL {
            cache.validate(table)?;
        }
        tracing::debug!(major, minor, "Loaded MIME cache");
        Ok(cache)
    }

    /// Read and load a cache file.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = match std::fs::read(path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                exn::bail!(ErrorKind::NotFound(path.to_path_buf()))
            },
            result => result.or_raise(|| ErrorKind::Io)?,
        };
        Self::from_bytes(data)
    }

    /// Check that a table's entry array lies inside the buffer.
    fn validate(&self, table: Table) -> Result<()> {
        let offset = self.table_offset(table);
        // (position of the first entry, entry stride)
        let (entries_at, stride) = match table {
            Table::Alias | Table::Parent => {
                self.ensure(table, offset, 4)?;
                (offset.saturating_add(4), 8)
            },
            Table::Literal | Table::Glob => {
                self.ensure(table, offset, 4)?;
                (offset.saturating_add(4), 12)
            },
            Table::ReverseSuffixTree => {
                self.ensure(table, offset, 8)?;
                (self.read_u32(offset.saturating_add(4)), 12)
            },
            Table::Magic => {
                self.ensure(table, offset, 12)?;
                (self.read_u32(offset.saturating_add(8)), 16)
            },
        };
        let length = u64::from(self.read_u32(offset)) * stride;
        if u64::from(entries_at) + length > self.data.len() as u64 {
            exn::bail!(ErrorKind::Truncated(table));
        }
        Ok(())
    }

    fn ensure(&self, table: Table, offset: u32, length: usize) -> Result<()> {
        if (offset as usize).saturating_add(length) > self.data.len() {
            exn::bail!(ErrorKind::Truncated(table));
        }
        Ok(())
    }

    /// Size of the underlying buffer in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Start offset of one of the six header tables.
    #[inline]
    #[must_use]
    pub fn table_offset(&self, table: Table) -> u32 {
        self.tables[table.slot()]
    }

    /// Read a big-endian `u32` at `offset`.
    ///
    /// Offsets only ever come from the cache itself. Reads past the end of a
    /// corrupt buffer yield zero, which ends whatever traversal asked.
    #[inline]
    #[must_use]
    pub fn read_u32(&self, offset: u32) -> u32 {
        let start = offset as usize;
        self.data
            .get(start..start.saturating_add(4))
            .and_then(|bytes| <[u8; 4]>::try_from(bytes).ok())
            .map(u32::from_be_bytes)
            .unwrap_or_default()
    }

    /// Raw bytes of the NUL-terminated string at `offset` (terminator excluded).
    #[must_use]
    pub fn read_cbytes(&self, offset: u32) -> &[u8] {
        let tail = self.data.get(offset as usize..).unwrap_or_default();
        match memchr(0, tail) {
            Some(end) => &tail[..end],
            None => tail,
        }
    }

    /// The NUL-terminated string at `offset`.
    #[must_use]
    pub fn read_cstr(&self, offset: u32) -> Cow<'_, str> {
        String::from_utf8_lossy(self.read_cbytes(offset))
    }

    /// Rewrite the glob pattern at `offset` as an anchored regular expression.
    ///
    /// Literal dots are escaped and the `*`, `+` and `?` wildcards become
    /// `.*`, `.+` and `.?`. Everything else (character classes included) is
    /// passed through.
    #[must_use]
    pub fn read_glob_regex(&self, offset: u32) -> String {
        let glob = self.read_cstr(offset);
        let mut regex = String::with_capacity(glob.len() + 8);
        regex.push('^');
        for c in glob.chars() {
            match c {
                '.' => regex.push('\\'),
                '*' | '+' | '?' => regex.push('.'),
                _ => {},
            }
            regex.push(c);
        }
        regex.push('$');
        regex
    }

    /// `length` bytes starting at `offset`, if they lie inside the buffer.
    #[must_use]
    pub fn read_slice(&self, offset: u32, length: u32) -> Option<&[u8]> {
        let start = offset as usize;
        self.data.get(start..start.checked_add(length as usize)?)
    }
}

/// Offset of entry `index` in an array of `stride`-byte entries at `base`.
#[inline]
pub(crate) fn entry(base: u32, stride: u32, index: u32) -> u32 {
    base.saturating_add(stride.saturating_mul(index))
}

/// Binary search over `count` sorted entries. `probe` compares the entry at
/// an index against the key being searched for.
pub(crate) fn bisect(count: u32, mut probe: impl FnMut(u32) -> Ordering) -> Option<u32> {
    let (mut low, mut high) = (0u32, count);
    while low < high {
        let mid = low + (high - low) / 2;
        match probe(mid) {
            Ordering::Less => low = mid + 1,
            Ordering::Greater => high = mid,
            Ordering::Equal => return Some(mid),
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::mock::MockCache;
    use rstest::rstest;

    fn cache() -> MimeCache {
        MockCache::new()
            .alias("text/xml", "application/xml")
            .glob("*.txt", "text/plain", 50, false)
            .into_cache()
    }

    #[test]
    fn loads_mock_cache() {
        let cache = cache();
        assert!(!cache.is_empty());
        for table in Table::ALL {
            assert!(cache.table_offset(table) as usize >= HEADER_LEN);
        }
    }

    #[test]
    fn read_u32_is_big_endian() {
        let cache = cache();
        // Major version 1, minor version 2.
        assert_eq!(cache.read_u32(0), 0x0001_0002);
    }

    #[test]
    fn read_u32_past_end_is_zero() {
        let cache = cache();
        let end = cache.len() as u32;
        assert_eq!(cache.read_u32(end), 0);
        assert_eq!(cache.read_u32(end - 2), 0);
        assert_eq!(cache.read_u32(u32::MAX), 0);
    }

    #[test]
    fn read_cstr_stops_at_nul() {
        let cache = cache();
        let alias_table = cache.table_offset(Table::Alias);
        assert_eq!(cache.read_u32(alias_table), 1);
        assert_eq!(cache.read_cstr(cache.read_u32(alias_table + 4)), "text/xml");
        assert_eq!(cache.read_cstr(cache.read_u32(alias_table + 8)), "application/xml");
    }

    #[rstest]
    #[case("*.[tT]xt", r"^.*\.[tT]xt$")]
    #[case("README*", r"^README.*$")]
    #[case("*.anim[1-9j]", r"^.*\.anim[1-9j]$")]
    #[case("a?c+", r"^a.?c.+$")]
    #[case("[Mm]akefile", r"^[Mm]akefile$")]
    fn test_read_glob_regex(#[case] glob: &str, #[case] expected: &str) {
        let cache = MockCache::new().glob(glob, "text/plain", 50, true).into_cache();
        let glob_table = cache.table_offset(Table::Glob);
        assert_eq!(cache.read_glob_regex(cache.read_u32(glob_table + 4)), expected);
    }

    #[test]
    fn rejects_short_header() {
        let err = MimeCache::from_bytes(vec![0, 1, 0, 2]).unwrap_err();
        assert_eq!(*err, ErrorKind::TruncatedHeader);
    }

    #[test]
    fn rejects_unknown_major_version() {
        let mut data = MockCache::new().build();
        data[1] = 2;
        let err = MimeCache::from_bytes(data).unwrap_err();
        assert_eq!(*err, ErrorKind::UnsupportedVersion { major: 2, minor: 2 });
    }

    #[test]
    fn rejects_truncated_table() {
        let data = MockCache::new().glob("*.txt", "text/plain", 50, false).build();
        let magic = u32::from_be_bytes([data[24], data[25], data[26], data[27]]) as usize;
        let err = MimeCache::from_bytes(data[..magic + 4].to_vec()).unwrap_err();
        assert_eq!(*err, ErrorKind::Truncated(Table::Magic));
    }

    #[test]
    fn rejects_out_of_bounds_count() {
        let mut data = MockCache::new().build();
        let alias = u32::from_be_bytes([data[4], data[5], data[6], data[7]]) as usize;
        data[alias..alias + 4].copy_from_slice(&1000u32.to_be_bytes());
        let err = MimeCache::from_bytes(data).unwrap_err();
        assert_eq!(*err, ErrorKind::Truncated(Table::Alias));
    }

    #[test]
    fn open_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mime.cache");
        let err = MimeCache::open(&path).unwrap_err();
        assert_eq!(*err, ErrorKind::NotFound(path));
    }

    #[test]
    fn open_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mime.cache");
        std::fs::write(&path, MockCache::new().glob("*.txt", "text/plain", 50, false).build()).unwrap();
        let cache = MimeCache::open(&path).unwrap();
        assert_eq!(cache.glob_mime_types("notes.txt").into_iter().collect::<Vec<_>>(), ["text/plain"]);
    }

    #[rstest]
    #[case(&[1, 3, 5, 7, 9], 7, Some(3))]
    #[case(&[1, 3, 5, 7, 9], 1, Some(0))]
    #[case(&[1, 3, 5, 7, 9], 9, Some(4))]
    #[case(&[1, 3, 5, 7, 9], 4, None)]
    #[case(&[], 4, None)]
    fn test_bisect(#[case] sorted: &[u32], #[case] key: u32, #[case] expected: Option<u32>) {
        let found = bisect(sorted.len() as u32, |i| sorted[i as usize].cmp(&key));
        assert_eq!(found, expected);
    }
}
