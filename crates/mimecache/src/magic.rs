//! Content sniffing with magic rules.
//!
//! A rule matches if any of its top-level matchlets matches. A matchlet
//! matches if its value is found somewhere in its byte window and, when it
//! has children, at least one child matches too.

use crate::store::entry;
use crate::{MimeCache, Table};
use std::borrow::Cow;
use std::collections::HashSet;

const RULE_STRIDE: u32 = 16;
const MATCHLET_STRIDE: u32 = 32;

/// View over one 32-byte matchlet entry.
#[derive(Clone, Copy)]
struct Matchlet<'a> {
    cache: &'a MimeCache,
    offset: u32,
}

impl Matchlet<'_> {
    fn field(&self, index: u32) -> u32 {
        self.cache.read_u32(self.offset + 4 * index)
    }

    /// Whether the value appears in `data` at any start position in
    /// `range_start..=range_start + range_length`. Windows running past the
    /// end of `data` never match.
    fn window_matches(&self, data: &[u8]) -> bool {
        let range_start = self.field(0) as usize;
        let range_length = self.field(1) as usize;
        let length = self.field(3);
        let Some(value) = self.cache.read_slice(self.field(4), length) else {
            return false;
        };
        let mask = match self.field(5) {
            0 => None,
            offset => match self.cache.read_slice(offset, length) {
                Some(mask) => Some(mask),
                None => return false,
            },
        };
        (0..=range_length)
            .map(|i| range_start.saturating_add(i))
            .map_while(|start| data.get(start..start.checked_add(value.len())?))
            .any(|window| match mask {
                Some(mask) => window.iter().zip(value).zip(mask).all(|((d, v), m)| d & m == v & m),
                None => window == value,
            })
    }

    fn matches(&self, data: &[u8]) -> bool {
        if !self.window_matches(data) {
            return false;
        }
        match self.field(6) {
            0 => true,
            children => self.cache.any_matchlet(children, self.field(7), data),
        }
    }
}

impl MimeCache {
    /// The most leading bytes any magic rule inspects. Supplying at least
    /// this many bytes (when available) gives the same result as the whole
    /// content.
    #[must_use]
    pub fn max_extent(&self) -> u32 {
        self.read_u32(self.table_offset(Table::Magic) + 4)
    }

    /// Media types whose magic rules match `data`, in stored priority order
    /// (highest first), each at most once.
    ///
    /// Lazy: rules after the last one consumed are never evaluated. `data`
    /// may be shorter than [`max_extent`](Self::max_extent); rules that need
    /// more bytes simply fail to match.
    pub fn magic_mime_types<'a>(&'a self, data: &'a [u8]) -> impl Iterator<Item = Cow<'a, str>> + 'a {
        let table = self.table_offset(Table::Magic);
        let first = self.read_u32(table + 8);
        let mut seen = HashSet::new();
        (0..self.read_u32(table))
            .map(move |i| entry(first, RULE_STRIDE, i))
            .filter(move |&rule| self.any_matchlet(self.read_u32(rule + 8), self.read_u32(rule + 12), data))
            .map(move |rule| self.read_cstr(self.read_u32(rule + 4)))
            .filter(move |mime_type| seen.insert(mime_type.clone()))
    }

    /// Whether any of `count` consecutive matchlets starting at `first` matches.
    fn any_matchlet(&self, count: u32, first: u32, data: &[u8]) -> bool {
        (0..count).any(|i| Matchlet { cache: self, offset: entry(first, MATCHLET_STRIDE, i) }.matches(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockCache, MockMatchlet};
    use rstest::rstest;

    fn magic(cache: &MimeCache, data: &[u8]) -> Vec<String> {
        cache.magic_mime_types(data).map(Cow::into_owned).collect()
    }

    #[test]
    fn preserves_priority_order() {
        let cache = MockCache::freedesktop().into_cache();
        let mut ogg = b"OggS".to_vec();
        ogg.resize(28, 0);
        ogg.extend_from_slice(b"\x01vorbis");
        assert_eq!(magic(&cache, &ogg), [
            "audio/x-vorbis+ogg",
            "application/ogg",
            "audio/ogg",
            "video/ogg"
        ]);
        assert_eq!(magic(&cache, b"OggS"), ["application/ogg", "audio/ogg", "video/ogg"]);
    }

    #[test]
    fn is_lazy() {
        let cache = MockCache::freedesktop().into_cache();
        assert_eq!(cache.magic_mime_types(b"OggS").next().as_deref(), Some("application/ogg"));
    }

    #[test]
    fn deduplicates_repeated_types() {
        let cache = MockCache::new()
            .magic(60, "application/zip", vec![MockMatchlet::new(0, b"PK\x03\x04")])
            .magic(50, "application/x-other", vec![MockMatchlet::new(0, b"PK")])
            .magic(40, "application/zip", vec![MockMatchlet::new(0, b"PK")])
            .into_cache();
        assert_eq!(magic(&cache, b"PK\x03\x04"), ["application/zip", "application/x-other"]);
    }

    #[rstest]
    #[case(0)]
    #[case(1)]
    #[case(33)]
    #[case(60)]
    fn searches_whole_window(#[case] at: usize) {
        let cache = MockCache::freedesktop().into_cache();
        let mut data = b"\x1a\x45\xdf\xa3".to_vec();
        data.resize(5 + at, b' ');
        data.extend_from_slice(b"matroska");
        assert_eq!(magic(&cache, &data), ["application/x-matroska"]);
    }

    #[test]
    fn window_is_bounded() {
        let cache = MockCache::freedesktop().into_cache();
        let mut data = b"\x1a\x45\xdf\xa3".to_vec();
        data.resize(5 + 61, b' ');
        data.extend_from_slice(b"matroska");
        assert!(magic(&cache, &data).is_empty());
    }

    #[rstest]
    #[case(b"\x0a\x05", &["image/x-pcx"])]
    #[case(b"\x0a\x02rest", &["image/x-pcx"])]
    // Parent matches but no child does.
    #[case(b"\x0a\x01", &[])]
    #[case(b"a\n", &[])]
    #[case(b"\x0a", &[])]
    fn children_must_match(#[case] data: &[u8], #[case] expected: &[&str]) {
        let cache = MockCache::freedesktop().into_cache();
        assert_eq!(magic(&cache, data), expected);
    }

    #[rstest]
    #[case(b"\xff\xfb\x90\x00", &["audio/mpeg"])]
    #[case(b"\xff\xe3", &["audio/mpeg"])]
    #[case(b"\xff\xd8\xff\xe0", &[])]
    fn applies_mask(#[case] data: &[u8], #[case] expected: &[&str]) {
        let cache = MockCache::freedesktop().into_cache();
        assert_eq!(magic(&cache, data), expected);
    }

    #[rstest]
    #[case(b"....ftypisom", "video/mp4")]
    #[case(b"....ftypmp41", "video/mp4")]
    #[case(b"....ftypmp42", "video/mp4")]
    #[case(b"<?xml version=\"1.0\"?>", "application/xml")]
    #[case(b"\x1f\x8b\x08\x00", "application/gzip")]
    #[case(b"PK\x03\x04", "application/zip")]
    fn top_level_matchlets_are_alternatives(#[case] data: &[u8], #[case] expected: &str) {
        let cache = MockCache::freedesktop().into_cache();
        assert_eq!(magic(&cache, data), [expected]);
    }

    #[rstest]
    #[case(b"")]
    #[case(b"Ogg")]
    #[case(b"....ftypiso")]
    fn short_data_does_not_match(#[case] data: &[u8]) {
        let cache = MockCache::freedesktop().into_cache();
        assert!(magic(&cache, data).is_empty());
    }

    #[test]
    fn max_extent() {
        let cache = MockCache::freedesktop().into_cache();
        // Matroska: child at 5, window 60, value 8 bytes.
        assert_eq!(cache.max_extent(), 73);
        assert_eq!(MockCache::new().into_cache().max_extent(), 0);
    }
}
