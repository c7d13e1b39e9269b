//! The detection procedure.

use crate::error::{ErrorKind, Result};
use crate::text::looks_like_text;
use exn::ResultExt;
use mimer_cache::{MimeCache, OCTET_STREAM, TEXT_PLAIN};
use std::collections::BTreeSet;
use std::error::Error as StdError;
use std::fs::File;
use std::future::Future;
use std::io::{Chain, Cursor, Read};
use std::path::Path;
use std::sync::Arc;
use tracing::instrument;

/// Decides the media type of files from their name and, only when the name
/// is not conclusive, their leading bytes.
///
/// Cheap to clone: every clone shares the same loaded database.
#[derive(Clone, Debug)]
pub struct Detector {
    cache: Arc<MimeCache>,
}

/// What the filename alone decided.
pub(crate) enum Plan {
    /// Exactly one best filename match. No content needed.
    Known(String),
    /// Zero or several filename matches; the content has to decide.
    NeedBytes(BTreeSet<String>),
}

impl From<MimeCache> for Detector {
    fn from(cache: MimeCache) -> Self {
        Self::new(Arc::new(cache))
    }
}

impl From<Arc<MimeCache>> for Detector {
    fn from(cache: Arc<MimeCache>) -> Self {
        Self::new(cache)
    }
}

impl Detector {
    pub fn new(cache: Arc<MimeCache>) -> Self {
        Self { cache }
    }

    /// Load the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let cache = MimeCache::open(path).map_err(ErrorKind::database)?;
        Ok(Self::from(cache))
    }

    pub fn cache(&self) -> &MimeCache {
        &self.cache
    }

    /// How many leading bytes of content detection may inspect. Byte sources
    /// need not supply more than this.
    pub fn max_bytes_needed(&self) -> usize {
        self.cache.max_extent() as usize
    }

    /// Detect the media type of a file from its name, calling `get_bytes`
    /// for its content only if the name is not conclusive.
    ///
    /// `get_bytes` is called at most once. Pass an empty filename to skip
    /// filename matching.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::GetBytes`] if the content was needed and `get_bytes`
    /// failed. Its error is attached as the cause.
    #[instrument(skip(self, get_bytes), fields(mime_type))]
    pub fn detect<F, E>(&self, filename: &str, get_bytes: F) -> Result<String>
    where
        F: FnOnce() -> std::result::Result<Vec<u8>, E>,
        E: StdError + Send + Sync + 'static,
    {
        let mime_type = match self.plan(filename) {
            Plan::Known(mime_type) => mime_type,
            Plan::NeedBytes(glob_types) => {
                let bytes = get_bytes().or_raise(|| ErrorKind::GetBytes)?;
                self.resolve(&glob_types, &bytes)
            },
        };
        tracing::Span::current().record("mime_type", mime_type.as_str());
        Ok(mime_type)
    }

    /// Async counterpart of [`detect`](Self::detect). The future returned by
    /// `get_bytes` is created and awaited only if the name is not conclusive.
    #[instrument(skip(self, get_bytes), fields(mime_type))]
    pub async fn detect_async<F, Fut, E>(&self, filename: &str, get_bytes: F) -> Result<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<Vec<u8>, E>>,
        E: StdError + Send + Sync + 'static,
    {
        let mime_type = match self.plan(filename) {
            Plan::Known(mime_type) => mime_type,
            Plan::NeedBytes(glob_types) => {
                let bytes = get_bytes().await.or_raise(|| ErrorKind::GetBytes)?;
                self.resolve(&glob_types, &bytes)
            },
        };
        tracing::Span::current().record("mime_type", mime_type.as_str());
        Ok(mime_type)
    }

    /// Detect from a filename and content already in memory.
    #[must_use]
    pub fn detect_bytes(&self, filename: &str, bytes: &[u8]) -> String {
        match self.plan(filename) {
            Plan::Known(mime_type) => mime_type,
            Plan::NeedBytes(glob_types) => self.resolve(&glob_types, bytes),
        }
    }

    /// Detect from a filename and a reader positioned at the start of the
    /// content. At most [`max_bytes_needed`](Self::max_bytes_needed) bytes are
    /// read, and none if the name is conclusive.
    ///
    /// Returns the media type with a reader that replays whatever head was
    /// read, then continues with the rest of `reader`.
    #[instrument(skip(self, reader), fields(mime_type))]
    pub fn detect_reader<R: Read>(&self, filename: &str, mut reader: R) -> Result<(String, Chain<Cursor<Vec<u8>>, R>)> {
        let mut head = Vec::new();
        let mime_type = match self.plan(filename) {
            Plan::Known(mime_type) => mime_type,
            Plan::NeedBytes(glob_types) => {
                let limit = self.max_bytes_needed() as u64;
                (&mut reader).take(limit).read_to_end(&mut head).or_raise(|| ErrorKind::GetBytes)?;
                self.resolve(&glob_types, &head)
            },
        };
        tracing::Span::current().record("mime_type", mime_type.as_str());
        Ok((mime_type, Cursor::new(head).chain(reader)))
    }

    /// Detect the type of a file on disk. The file is only opened if its name
    /// is not conclusive.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn detect_path(&self, path: impl AsRef<Path>) -> Result<String> {
        let path = path.as_ref();
        let filename = path.file_name().map(|name| name.to_string_lossy()).unwrap_or_default();
        let limit = self.max_bytes_needed();
        self.detect(&filename, || read_head(File::open(path)?, limit))
    }

    pub(crate) fn plan(&self, filename: &str) -> Plan {
        let mut glob_types = self.cache.glob_mime_types(filename);
        if glob_types.len() == 1
            && let Some(mime_type) = glob_types.pop_first()
        {
            tracing::debug!(%mime_type, "Filename is conclusive");
            return Plan::Known(mime_type);
        }
        tracing::debug!(candidates = glob_types.len(), "Filename is not conclusive, checking content");
        Plan::NeedBytes(glob_types)
    }

    /// Reconcile the filename candidates with the content.
    ///
    /// Magic matches are taken in priority order. Without filename candidates
    /// the first magic match wins; otherwise the first filename candidate that
    /// is (a subclass of) a magic match wins. Failing both, the content is
    /// classified as text or binary.
    pub(crate) fn resolve(&self, glob_types: &BTreeSet<String>, bytes: &[u8]) -> String {
        let bytes = &bytes[..bytes.len().min(self.max_bytes_needed())];
        for magic_type in self.cache.magic_mime_types(bytes) {
            if glob_types.is_empty() {
                tracing::debug!(%magic_type, "Content match");
                return magic_type.into_owned();
            }
            if let Some(glob_type) = glob_types.iter().find(|g| self.cache.is_equal_or_subclass(g, &magic_type)) {
                tracing::debug!(%glob_type, %magic_type, "Filename match confirmed by content");
                return glob_type.clone();
            }
        }
        let mime_type = if looks_like_text(bytes) { TEXT_PLAIN } else { OCTET_STREAM };
        tracing::debug!(mime_type, "No content match, falling back");
        mime_type.to_string()
    }
}

/// Read up to `limit` bytes from the start of `reader`.
pub(crate) fn read_head(reader: impl Read, limit: usize) -> std::io::Result<Vec<u8>> {
    let mut head = Vec::with_capacity(limit);
    reader.take(limit as u64).read_to_end(&mut head)?;
    Ok(head)
}
