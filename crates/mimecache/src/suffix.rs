//! Reverse suffix tree walk.
//!
//! Each level of the tree is a sorted array of `(character, child count,
//! child offset)` nodes. Terminal nodes have character 0, sort first, and
//! carry `(0, mime type offset, weight and flags)` instead.

use crate::glob::weight_and_case;
use crate::store::{bisect, entry};
use crate::{MimeCache, Table, WeightedMime};
use std::collections::HashSet;

const NODE_STRIDE: u32 = 12;

impl MimeCache {
    /// Match the end of `filename` against the reverse suffix tree.
    ///
    /// The longest stored suffix wins. A shorter suffix's terminals are only
    /// used when nothing deeper matched. With `ignore_case` the lower-cased
    /// filename is walked.
    #[must_use]
    pub fn suffix_candidates(&self, filename: &str, ignore_case: bool) -> HashSet<WeightedMime> {
        let name: Vec<char> = if ignore_case {
            filename.to_lowercase().chars().collect()
        } else {
            filename.chars().collect()
        };
        let table = self.table_offset(Table::ReverseSuffixTree);
        let mut found = HashSet::new();
        self.walk_suffix(&name, name.len(), self.read_u32(table), self.read_u32(table + 4), &mut found);
        found
    }

    /// Consume `name[remaining - 1]` at the level of `count` nodes starting
    /// at `level`. Everything after it has already been matched.
    fn walk_suffix(&self, name: &[char], remaining: usize, count: u32, level: u32, found: &mut HashSet<WeightedMime>) {
        let Some(&c) = remaining.checked_sub(1).and_then(|i| name.get(i)) else {
            return;
        };
        if c == '\0' {
            return;
        }
        let Some(index) = bisect(count, |i| self.read_u32(entry(level, NODE_STRIDE, i)).cmp(&u32::from(c))) else {
            return;
        };
        let node = entry(level, NODE_STRIDE, index);
        let children = self.read_u32(node + 4);
        let child_level = self.read_u32(node + 8);
        let remaining = remaining - 1;
        if remaining > 0 {
            self.walk_suffix(name, remaining, children, child_level, found);
        }
        if !found.is_empty() {
            return;
        }
        let pattern: String = std::iter::once('*').chain(name[remaining..].iter().copied()).collect();
        for i in 0..children {
            let leaf = entry(child_level, NODE_STRIDE, i);
            if self.read_u32(leaf) != 0 {
                break;
            }
            let (weight, _) = weight_and_case(self.read_u32(leaf + 8));
            found.insert(WeightedMime::new(self.read_cstr(self.read_u32(leaf + 4)), pattern.as_str(), weight));
        }
    }
}
