//! Filename lookups: literal names and wildcard globs.
//!
//! The reverse suffix tree lives in [`suffix`](crate::suffix).

use crate::store::{bisect, entry};
use crate::{MimeCache, Table, WeightedMime};
use regex::RegexBuilder;
use std::collections::HashSet;
use tracing::instrument;

/// Literal and glob entries: (pattern offset, mime type offset, weight and flags).
const GLOB_STRIDE: u32 = 12;
/// Flag bit of a weight field; clear means the rule ignores case.
const CASE_SENSITIVE: u32 = 0x100;

/// Split a stored weight field into its weight and case-sensitivity flag.
#[inline]
pub(crate) fn weight_and_case(field: u32) -> (u8, bool) {
    ((field & 0xff) as u8, field & CASE_SENSITIVE != 0)
}

impl MimeCache {
    /// Every filename rule candidate for `filename`, from the first lookup
    /// strategy that produces any:
    ///
    /// 1. exact literal name (authoritative, at most one candidate)
    /// 2. reverse suffix tree, case-sensitive
    /// 3. reverse suffix tree, on the lower-cased name
    /// 4. wildcard globs
    ///
    /// An empty filename skips filename matching entirely.
    #[instrument(level = "trace", skip(self))]
    pub fn glob_candidates(&self, filename: &str) -> HashSet<WeightedMime> {
        if filename.is_empty() {
            return HashSet::new();
        }
        if let Some(literal) = self.literal_candidate(filename) {
            tracing::trace!(%literal, "Literal filename match");
            return HashSet::from([literal]);
        }
        for ignore_case in [false, true] {
            let found = self.suffix_candidates(filename, ignore_case);
            if !found.is_empty() {
                tracing::trace!(ignore_case, candidates = found.len(), "Suffix match");
                return found;
            }
        }
        self.wildcard_candidates(filename)
    }

    /// Binary search the literal table. Each entry is compared against the
    /// filename as given, or lower-cased when the entry ignores case.
    #[must_use]
    pub fn literal_candidate(&self, filename: &str) -> Option<WeightedMime> {
        let table = self.table_offset(Table::Literal);
        let lower = filename.to_lowercase();
        let index = bisect(self.read_u32(table), |i| {
            let at = entry(table + 4, GLOB_STRIDE, i);
            let (_, case_sensitive) = weight_and_case(self.read_u32(at + 8));
            let key = if case_sensitive { filename } else { lower.as_str() };
            self.read_cbytes(self.read_u32(at)).cmp(key.as_bytes())
        })?;
        let at = entry(table + 4, GLOB_STRIDE, index);
        let (weight, _) = weight_and_case(self.read_u32(at + 8));
        Some(WeightedMime::new(
            self.read_cstr(self.read_u32(at + 4)),
            self.read_cstr(self.read_u32(at)),
            weight,
        ))
    }

    /// Test every wildcard glob against the whole filename.
    ///
    /// Globs are compiled on demand; one that does not form a valid regular
    /// expression is skipped.
    #[must_use]
    pub fn wildcard_candidates(&self, filename: &str) -> HashSet<WeightedMime> {
        let table = self.table_offset(Table::Glob);
        (0..self.read_u32(table))
            .filter_map(|i| {
                let at = entry(table + 4, GLOB_STRIDE, i);
                let pattern = self.read_u32(at);
                let (weight, case_sensitive) = weight_and_case(self.read_u32(at + 8));
                let regex = match RegexBuilder::new(&self.read_glob_regex(pattern))
                    .case_insensitive(!case_sensitive)
                    .build()
                {
                    Ok(regex) => regex,
                    Err(e) => {
                        tracing::warn!(glob = %self.read_cstr(pattern), error = %e, "Skipping unusable glob");
                        return None;
                    },
                };
                regex.is_match(filename).then(|| {
                    WeightedMime::new(self.read_cstr(self.read_u32(at + 4)), self.read_cstr(pattern), weight)
                })
            })
            .collect()
    }
}
