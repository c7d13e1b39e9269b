//! Mock cache builder for tests (feature `mock`).
//!
//! Serialises rule sets into the same binary layout `update-mime-database`
//! produces, so tests can exercise the reader without a system-installed
//! database. Globs are classified the way the real generator does it: no
//! wildcard characters is a literal, `*` followed by no wildcard characters
//! is a suffix, anything else is a wildcard glob.

use crate::MimeCache;
use std::collections::{BTreeMap, HashMap};

const CASE_SENSITIVE: u32 = 0x100;
const HEADER_LEN: usize = 40;

#[derive(Clone, Debug)]
struct GlobRule {
    pattern: String,
    mime_type: String,
    weight: u32,
}

#[derive(Clone, Debug)]
struct MagicRule {
    priority: u32,
    mime_type: String,
    matchlets: Vec<MockMatchlet>,
}

/// One byte-range test of a magic rule.
#[derive(Clone, Debug)]
pub struct MockMatchlet {
    range_start: u32,
    range_length: u32,
    value: Vec<u8>,
    mask: Option<Vec<u8>>,
    children: Vec<MockMatchlet>,
}

impl MockMatchlet {
    /// Match `value` at `offset`. The range length defaults to 1, as written
    /// by `update-mime-database` for a single offset.
    pub fn new(offset: u32, value: impl AsRef<[u8]>) -> Self {
        Self {
            range_start: offset,
            range_length: 1,
            value: value.as_ref().to_vec(),
            mask: None,
            children: Vec::new(),
        }
    }

    pub fn range(mut self, length: u32) -> Self {
        self.range_length = length;
        self
    }

    /// Compare `value` and the data only under `mask` (same length as `value`).
    pub fn mask(mut self, mask: impl AsRef<[u8]>) -> Self {
        self.mask = Some(mask.as_ref().to_vec());
        self
    }

    pub fn child(mut self, child: MockMatchlet) -> Self {
        self.children.push(child);
        self
    }

    fn extent(&self) -> u32 {
        let own = self.range_start + self.range_length + self.value.len() as u32;
        self.children.iter().map(MockMatchlet::extent).fold(own, u32::max)
    }
}

/// Builder for a binary `mime.cache`.
#[derive(Clone, Debug, Default)]
pub struct MockCache {
    aliases: BTreeMap<String, String>,
    parents: BTreeMap<String, Vec<String>>,
    literals: Vec<GlobRule>,
    suffixes: Vec<GlobRule>,
    globs: Vec<GlobRule>,
    magic: Vec<MagicRule>,
}

impl MockCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alias(mut self, alias: &str, canonical: &str) -> Self {
        self.aliases.insert(alias.to_string(), canonical.to_string());
        self
    }

    pub fn parent(mut self, mime_type: &str, parent: &str) -> Self {
        self.parents.entry(mime_type.to_string()).or_default().push(parent.to_string());
        self
    }

    pub fn glob(mut self, pattern: &str, mime_type: &str, weight: u8, case_sensitive: bool) -> Self {
        let is_wild = |s: &str| s.contains(['*', '?', '[']);
        let fold = |s: &str| if case_sensitive { s.to_string() } else { s.to_lowercase() };
        let weight = u32::from(weight) | if case_sensitive { CASE_SENSITIVE } else { 0 };
        let mime_type = mime_type.to_string();
        if !is_wild(pattern) {
            self.literals.push(GlobRule { pattern: fold(pattern), mime_type, weight });
        } else if let Some(suffix) = pattern.strip_prefix('*')
            && !suffix.is_empty()
            && !is_wild(suffix)
        {
            self.suffixes.push(GlobRule { pattern: fold(suffix), mime_type, weight });
        } else {
            self.globs.push(GlobRule { pattern: pattern.to_string(), mime_type, weight });
        }
        self
    }

    /// Add a magic rule. Its matchlets are alternatives; rules are stored by
    /// descending priority, ties kept in insertion order.
    pub fn magic(mut self, priority: u32, mime_type: &str, matchlets: Vec<MockMatchlet>) -> Self {
        self.magic.push(MagicRule { priority, mime_type: mime_type.to_string(), matchlets });
        self
    }

    pub fn into_cache(self) -> MimeCache {
        MimeCache::from_bytes(self.build()).expect("mock cache should always be valid")
    }

    /// Serialise into the binary cache format (version 1.2).
    pub fn build(&self) -> Vec<u8> {
        let mut w = Writer::default();
        w.buf.resize(HEADER_LEN, 0);
        w.set_u32(0, 0x0001_0002);

        let alias_table = self.write_aliases(&mut w);
        let parent_table = self.write_parents(&mut w);
        let literal_table = self.write_literals(&mut w);
        let suffix_table = self.write_suffix_tree(&mut w);
        let glob_table = w.write_glob_list(&self.globs);
        let magic_table = self.write_magic(&mut w);
        // Namespace, icon and generic icon lists: not read, always empty.
        let unused = [w.reserve(4), w.reserve(4), w.reserve(4)];

        let offsets = [alias_table, parent_table, literal_table, suffix_table, glob_table, magic_table];
        for (slot, offset) in offsets.into_iter().chain(unused).enumerate() {
            w.set_u32(4 + 4 * slot as u32, offset);
        }
        w.buf
    }

    fn write_aliases(&self, w: &mut Writer) -> u32 {
        let table = w.reserve(4 + 8 * self.aliases.len());
        w.set_u32(table, self.aliases.len() as u32);
        for (i, (alias, canonical)) in self.aliases.iter().enumerate() {
            let entry = table + 4 + 8 * i as u32;
            let alias = w.string(alias);
            let canonical = w.string(canonical);
            w.set_u32(entry, alias);
            w.set_u32(entry + 4, canonical);
        }
        table
    }

    fn write_parents(&self, w: &mut Writer) -> u32 {
        let table = w.reserve(4 + 8 * self.parents.len());
        w.set_u32(table, self.parents.len() as u32);
        for (i, (mime_type, parents)) in self.parents.iter().enumerate() {
            let entry = table + 4 + 8 * i as u32;
            let mime_type = w.string(mime_type);
            let list = w.reserve(4 + 4 * parents.len());
            w.set_u32(list, parents.len() as u32);
            for (j, parent) in parents.iter().enumerate() {
                let parent = w.string(parent);
                w.set_u32(list + 4 + 4 * j as u32, parent);
            }
            w.set_u32(entry, mime_type);
            w.set_u32(entry + 4, list);
        }
        table
    }

    fn write_literals(&self, w: &mut Writer) -> u32 {
        let mut literals = self.literals.clone();
        literals.sort_by(|a, b| a.pattern.as_bytes().cmp(b.pattern.as_bytes()));
        w.write_glob_list(&literals)
    }

    fn write_suffix_tree(&self, w: &mut Writer) -> u32 {
        let mut root = SuffixNode::default();
        for rule in &self.suffixes {
            let node = rule.pattern.chars().rev().fold(&mut root, |node, c| node.children.entry(c).or_default());
            node.leaves.push((rule.mime_type.clone(), rule.weight));
        }
        let table = w.reserve(8);
        w.set_u32(table, root.entries());
        let first = w.write_suffix_level(&root);
        w.set_u32(table + 4, first);
        table
    }

    fn write_magic(&self, w: &mut Writer) -> u32 {
        let mut rules = self.magic.clone();
        rules.sort_by(|a, b| b.priority.cmp(&a.priority));
        let max_extent = rules.iter().flat_map(|r| r.matchlets.iter()).map(MockMatchlet::extent).max();

        let table = w.reserve(12 + 16 * rules.len());
        w.set_u32(table, rules.len() as u32);
        w.set_u32(table + 4, max_extent.unwrap_or_default());
        w.set_u32(table + 8, table + 12);
        for (i, rule) in rules.iter().enumerate() {
            let entry = table + 12 + 16 * i as u32;
            let mime_type = w.string(&rule.mime_type);
            let first = w.write_matchlets(&rule.matchlets);
            w.set_u32(entry, rule.priority);
            w.set_u32(entry + 4, mime_type);
            w.set_u32(entry + 8, rule.matchlets.len() as u32);
            w.set_u32(entry + 12, first);
        }
        table
    }

    /// A small, faithful subset of the freedesktop.org rules.
    pub fn freedesktop() -> Self {
        let ogg = || MockMatchlet::new(0, b"OggS");
        Self::new()
            .alias("application/x-ogg", "application/ogg")
            .alias("text/xml", "application/xml")
            .alias("application/x-javascript", "text/javascript")
            .alias("application/x-gzip", "application/gzip")
            .parent("audio/ogg", "application/ogg")
            .parent("video/ogg", "application/ogg")
            .parent("audio/x-vorbis+ogg", "audio/ogg")
            .parent("application/xml", "text/plain")
            .parent("image/svg+xml", "application/xml")
            .parent("text/x-log", "text/plain")
            .parent("text/x-readme", "text/plain")
            .parent("text/x-makefile", "text/plain")
            .parent("text/javascript", "application/ecmascript")
            .parent("video/x-matroska", "application/x-matroska")
            .parent("application/x-compressed-tar", "application/gzip")
            .parent("application/x-java-archive", "application/zip")
            .glob("makefile", "text/x-makefile", 50, false)
            .glob("GNUmakefile", "text/x-makefile", 50, true)
            .glob("winmail.dat", "application/vnd.ms-tnef", 50, false)
            .glob("README*", "text/x-readme", 10, false)
            .glob("*.log", "text/x-log", 50, false)
            .glob("*.txt", "text/plain", 50, false)
            .glob("*.anim[1-9j]", "video/x-anim", 50, false)
            .glob("*.Z", "application/x-compress", 50, true)
            .glob("*.jar", "application/x-java-archive", 50, false)
            .glob("*.js", "text/javascript", 50, false)
            .glob("*.pst", "application/vnd.ms-outlook", 50, false)
            .glob("*.cur", "image/x-win-bitmap", 50, false)
            .glob("*.xml", "application/xml", 50, false)
            .glob("*.svg", "image/svg+xml", 50, false)
            .glob("*.gz", "application/gzip", 50, false)
            .glob("*.tar.gz", "application/x-compressed-tar", 50, false)
            .glob("*.ogg", "audio/ogg", 50, false)
            .glob("*.ogg", "audio/x-vorbis+ogg", 50, false)
            .glob("*.ogv", "video/ogg", 50, false)
            .glob("*.mkv", "video/x-matroska", 50, false)
            .glob("*.mp4", "video/mp4", 50, false)
            .magic(80, "application/x-matroska", vec![
                MockMatchlet::new(0, b"\x1a\x45\xdf\xa3").child(MockMatchlet::new(5, b"matroska").range(60)),
            ])
            .magic(60, "audio/x-vorbis+ogg", vec![ogg().child(MockMatchlet::new(28, b"\x01vorbis"))])
            .magic(50, "application/ogg", vec![ogg()])
            .magic(50, "audio/ogg", vec![ogg()])
            .magic(50, "video/ogg", vec![ogg()])
            .magic(50, "video/mp4", vec![
                MockMatchlet::new(4, b"ftypisom"),
                MockMatchlet::new(4, b"ftypmp41"),
                MockMatchlet::new(4, b"ftypmp42"),
            ])
            .magic(50, "image/x-pcx", vec![
                MockMatchlet::new(0, [0x0a])
                    .child(MockMatchlet::new(1, [0x00]))
                    .child(MockMatchlet::new(1, [0x02]))
                    .child(MockMatchlet::new(1, [0x03]))
                    .child(MockMatchlet::new(1, [0x05])),
            ])
            .magic(50, "application/gzip", vec![MockMatchlet::new(0, b"\x1f\x8b")])
            .magic(40, "application/xml", vec![MockMatchlet::new(0, b"<?xml")])
            .magic(40, "application/zip", vec![MockMatchlet::new(0, b"PK\x03\x04")])
            .magic(20, "audio/mpeg", vec![MockMatchlet::new(0, [0xff, 0xe0]).mask([0xff, 0xe0])])
    }
}

#[derive(Default)]
struct SuffixNode {
    children: BTreeMap<char, SuffixNode>,
    leaves: Vec<(String, u32)>,
}

impl SuffixNode {
    fn entries(&self) -> u32 {
        (self.leaves.len() + self.children.len()) as u32
    }
}

#[derive(Default)]
struct Writer {
    buf: Vec<u8>,
    strings: HashMap<String, u32>,
}

impl Writer {
    fn reserve(&mut self, length: usize) -> u32 {
        let at = self.buf.len() as u32;
        self.buf.resize(self.buf.len() + length, 0);
        at
    }

    fn set_u32(&mut self, at: u32, value: u32) {
        let at = at as usize;
        self.buf[at..at + 4].copy_from_slice(&value.to_be_bytes());
    }

    /// Append raw bytes, padded to a four byte boundary.
    fn data(&mut self, bytes: &[u8], nul: bool) -> u32 {
        let at = self.buf.len() as u32;
        self.buf.extend_from_slice(bytes);
        if nul {
            self.buf.push(0);
        }
        while self.buf.len() % 4 != 0 {
            self.buf.push(0);
        }
        at
    }

    fn string(&mut self, s: &str) -> u32 {
        if let Some(&at) = self.strings.get(s) {
            return at;
        }
        let at = self.data(s.as_bytes(), true);
        self.strings.insert(s.to_string(), at);
        at
    }

    /// Literal and glob lists share a layout: count, then
    /// (pattern, mime type, weight and flags) triples.
    fn write_glob_list(&mut self, rules: &[GlobRule]) -> u32 {
        let table = self.reserve(4 + 12 * rules.len());
        self.set_u32(table, rules.len() as u32);
        for (i, rule) in rules.iter().enumerate() {
            let entry = table + 4 + 12 * i as u32;
            let pattern = self.string(&rule.pattern);
            let mime_type = self.string(&rule.mime_type);
            self.set_u32(entry, pattern);
            self.set_u32(entry + 4, mime_type);
            self.set_u32(entry + 8, rule.weight);
        }
        table
    }

    /// Leaves (character 0) sort before every other entry of a level.
    fn write_suffix_level(&mut self, node: &SuffixNode) -> u32 {
        let level = self.reserve(12 * node.entries() as usize);
        for (i, (mime_type, weight)) in node.leaves.iter().enumerate() {
            let leaf = level + 12 * i as u32;
            let mime_type = self.string(mime_type);
            self.set_u32(leaf, 0);
            self.set_u32(leaf + 4, mime_type);
            self.set_u32(leaf + 8, *weight);
        }
        for (i, (c, child)) in node.children.iter().enumerate() {
            let entry = level + 12 * (node.leaves.len() + i) as u32;
            let child_level = self.write_suffix_level(child);
            self.set_u32(entry, u32::from(*c));
            self.set_u32(entry + 4, child.entries());
            self.set_u32(entry + 8, child_level);
        }
        level
    }

    fn write_matchlets(&mut self, matchlets: &[MockMatchlet]) -> u32 {
        if matchlets.is_empty() {
            return 0;
        }
        let first = self.reserve(32 * matchlets.len());
        for (i, matchlet) in matchlets.iter().enumerate() {
            let entry = first + 32 * i as u32;
            let value = self.data(&matchlet.value, false);
            let mask = matchlet.mask.as_ref().map(|mask| self.data(mask, false)).unwrap_or_default();
            let children = self.write_matchlets(&matchlet.children);
            self.set_u32(entry, matchlet.range_start);
            self.set_u32(entry + 4, matchlet.range_length);
            self.set_u32(entry + 8, 1);
            self.set_u32(entry + 12, matchlet.value.len() as u32);
            self.set_u32(entry + 16, value);
            self.set_u32(entry + 20, mask);
            self.set_u32(entry + 24, matchlet.children.len() as u32);
            self.set_u32(entry + 28, children);
        }
        first
    }
}
