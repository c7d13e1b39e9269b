//! Aliases and the subclass graph.

use crate::store::{bisect, entry};
use crate::{MimeCache, OCTET_STREAM, TEXT_PLAIN, Table};
use std::borrow::Cow;

const EDGE_STRIDE: u32 = 8;
/// Parent chains in real databases are a handful of levels deep. Anything
/// deeper than this is a cycle in a corrupt cache.
const MAX_DEPTH: usize = 32;

/// Top-level media type (`text` in `text/plain`).
fn media_type(mime_type: &str) -> &str {
    mime_type.split_once('/').map_or(mime_type, |(media, _)| media)
}

impl MimeCache {
    /// The canonical name for `mime_type`, or `mime_type` itself when it is
    /// not a known alias.
    #[must_use]
    pub fn unalias<'a>(&'a self, mime_type: &'a str) -> Cow<'a, str> {
        let table = self.table_offset(Table::Alias);
        let found = bisect(self.read_u32(table), |i| {
            self.read_cbytes(self.read_u32(entry(table + 4, EDGE_STRIDE, i))).cmp(mime_type.as_bytes())
        });
        match found {
            Some(i) => self.read_cstr(self.read_u32(entry(table + 4, EDGE_STRIDE, i) + 4)),
            None => Cow::Borrowed(mime_type),
        }
    }

    /// Whether `child` is `parent` or (transitively) one of its subclasses,
    /// after resolving aliases on both sides.
    ///
    /// Every `text/*` type is a subclass of `text/plain`, every type is a
    /// subclass of `application/octet-stream`, and a `media/*` parent
    /// covers every type of that media type.
    #[must_use]
    pub fn is_equal_or_subclass(&self, child: &str, parent: &str) -> bool {
        self.is_subclass_within(child, parent, MAX_DEPTH)
    }

    fn is_subclass_within(&self, child: &str, parent: &str, depth: usize) -> bool {
        let child = self.unalias(child);
        let parent = self.unalias(parent);
        if child == parent
            || (parent == TEXT_PLAIN && child.starts_with("text/"))
            || parent == OCTET_STREAM
            || (parent.ends_with("/*") && media_type(&child) == media_type(&parent))
        {
            return true;
        }
        let Some(depth) = depth.checked_sub(1) else {
            tracing::warn!(%child, %parent, "Subclass chain too deep, giving up");
            return false;
        };
        self.parents(&child).any(|direct| self.is_subclass_within(&direct, &parent, depth))
    }

    /// Direct parents of `mime_type` as listed in the parent table.
    fn parents<'a>(&'a self, mime_type: &str) -> impl Iterator<Item = Cow<'a, str>> + 'a {
        let table = self.table_offset(Table::Parent);
        let list = bisect(self.read_u32(table), |i| {
            self.read_cbytes(self.read_u32(entry(table + 4, EDGE_STRIDE, i))).cmp(mime_type.as_bytes())
        })
        .map(|i| self.read_u32(entry(table + 4, EDGE_STRIDE, i) + 4));
        list.into_iter().flat_map(move |list| {
            (0..self.read_u32(list)).map(move |i| self.read_cstr(self.read_u32(entry(list + 4, 4, i))))
        })
    }
}
