//! Tie-breaking between filename matches.

use crate::MimeCache;
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter, Result as FmtResult};

/// A media type matched by a filename rule.
///
/// Two candidates are the same candidate only if type, pattern and weight
/// all agree; lookups deduplicate on the whole triple.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WeightedMime {
    pub mime_type: String,
    /// The rule text that matched (literal, suffix or glob).
    pub pattern: String,
    /// Specificity, 0 to 100.
    pub weight: u8,
}

impl WeightedMime {
    pub fn new(mime_type: impl Into<String>, pattern: impl Into<String>, weight: u8) -> Self {
        Self { mime_type: mime_type.into(), pattern: pattern.into(), weight }
    }
}

impl Display for WeightedMime {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}({}, {})", self.mime_type, self.pattern, self.weight)
    }
}

/// Keep the candidates with the highest weight, then among those the ones
/// with the longest pattern, and return their distinct media types.
pub fn best_mime_types<'a>(candidates: impl IntoIterator<Item = &'a WeightedMime>) -> BTreeSet<String> {
    let candidates: Vec<&WeightedMime> = candidates.into_iter().collect();
    let Some(best_weight) = candidates.iter().map(|c| c.weight).max() else {
        return BTreeSet::new();
    };
    let heaviest: Vec<&WeightedMime> = candidates.into_iter().filter(|c| c.weight == best_weight).collect();
    let longest = heaviest.iter().map(|c| c.pattern.chars().count()).max().unwrap_or_default();
    heaviest
        .into_iter()
        .filter(|c| c.pattern.chars().count() == longest)
        .map(|c| c.mime_type.clone())
        .collect()
}

impl MimeCache {
    /// The best media types for a filename: glob lookup followed by the
    /// weight and pattern-length tie-break. Empty when nothing matched.
    #[must_use]
    pub fn glob_mime_types(&self, filename: &str) -> BTreeSet<String> {
        best_mime_types(&self.glob_candidates(filename))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn names(set: BTreeSet<String>) -> Vec<String> {
        set.into_iter().collect()
    }

    #[test]
    fn empty_candidates() {
        assert!(best_mime_types(std::iter::empty()).is_empty());
    }

    #[test]
    fn highest_weight_wins() {
        let candidates = [
            WeightedMime::new("text/x-readme", "README*", 10),
            WeightedMime::new("text/x-log", "*.log", 50),
        ];
        assert_eq!(names(best_mime_types(&candidates)), ["text/x-log"]);
    }

    #[test]
    fn longest_pattern_breaks_weight_tie() {
        let candidates = [
            WeightedMime::new("application/gzip", "*.gz", 50),
            WeightedMime::new("application/x-compressed-tar", "*.tar.gz", 50),
        ];
        assert_eq!(names(best_mime_types(&candidates)), ["application/x-compressed-tar"]);
    }

    #[test]
    fn weight_beats_length() {
        let candidates = [
            WeightedMime::new("application/x-long", "*.very-long-extension", 40),
            WeightedMime::new("application/x-short", "*.s", 60),
        ];
        assert_eq!(names(best_mime_types(&candidates)), ["application/x-short"]);
    }

    #[rstest]
    #[case(&[("audio/ogg", "*.ogg", 50), ("audio/x-vorbis+ogg", "*.ogg", 50)], &["audio/ogg", "audio/x-vorbis+ogg"])]
    #[case(&[("audio/ogg", "*.ogg", 50), ("audio/ogg", "*.ogg", 50)], &["audio/ogg"])]
    #[case(&[("audio/ogg", "*.ogg", 50), ("audio/ogg", "*.oga", 50)], &["audio/ogg"])]
    fn ties_are_deduplicated(#[case] input: &[(&str, &str, u8)], #[case] expected: &[&str]) {
        let candidates: Vec<WeightedMime> = input.iter().map(|(m, p, w)| WeightedMime::new(*m, *p, *w)).collect();
        assert_eq!(names(best_mime_types(&candidates)), expected);
    }

    #[test]
    fn display() {
        assert_eq!(WeightedMime::new("text/x-log", "*.log", 50).to_string(), "text/x-log(*.log, 50)");
    }
}
