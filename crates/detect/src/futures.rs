//! Async reader support (feature `async`).
//!
//! Uses [`futures::io`] traits rather than Tokio-specific types for runtime
//! portability.

use crate::Detector;
use crate::detector::Plan;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use futures::io::{AsyncRead, AsyncReadExt};
use futures::io::{Chain as AsyncChain, Cursor as AsyncCursor};
use tracing::instrument;

impl Detector {
    /// Async counterpart of [`detect_reader`](Detector::detect_reader). The
    /// returned reader replays the head that was read, then the rest of
    /// `reader`.
    #[instrument(skip(self, reader), fields(mime_type))]
    pub async fn detect_async_reader<R: AsyncRead + Unpin>(
        &self,
        filename: &str,
        mut reader: R,
    ) -> Result<(String, AsyncChain<AsyncCursor<Vec<u8>>, R>)> {
        let mut head = Vec::new();
        let mime_type = match self.plan(filename) {
            Plan::Known(mime_type) => mime_type,
            Plan::NeedBytes(glob_types) => {
                let limit = self.max_bytes_needed() as u64;
                (&mut reader).take(limit).read_to_end(&mut head).await.or_raise(|| ErrorKind::GetBytes)?;
                self.resolve(&glob_types, &head)
            },
        };
        tracing::Span::current().record("mime_type", mime_type.as_str());
        Ok((mime_type, AsyncCursor::new(head).chain(reader)))
    }
}

#[cfg(test)]
mod tests {
    use crate::Detector;
    use crate::error::ErrorKind;
    use futures::io::{AsyncRead, AsyncReadExt, Cursor};
    use mimer_cache::mock::MockCache;
    use rstest::rstest;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    fn detector() -> Detector {
        Detector::from(MockCache::freedesktop().into_cache())
    }

    #[rstest]
    #[case("", b"OggS", "application/ogg")]
    #[case("song.ogg", b"OggS", "audio/ogg")]
    #[case("notes.txt", b"\x00\x00", "text/plain")]
    #[case("", b"", "application/octet-stream")]
    #[tokio::test]
    async fn test_detect_async_reader(#[case] filename: &str, #[case] bytes: &[u8], #[case] expected: &str) {
        let (mime_type, mut replay) =
            detector().detect_async_reader(filename, Cursor::new(bytes.to_vec())).await.unwrap();
        assert_eq!(mime_type, expected);
        let mut all = Vec::new();
        replay.read_to_end(&mut all).await.unwrap();
        assert_eq!(all, bytes);
    }

    #[tokio::test]
    async fn reads_at_most_max_extent_and_replays() {
        let detector = detector();
        let content = vec![b'a'; 1000];
        let (mime_type, mut replay) = detector.detect_async_reader("", Cursor::new(content.clone())).await.unwrap();
        assert_eq!(mime_type, "text/plain");
        let (head, rest) = replay.get_ref();
        assert_eq!(head.get_ref().len(), detector.max_bytes_needed());
        assert_eq!(rest.position(), detector.max_bytes_needed() as u64);
        let mut all = Vec::new();
        replay.read_to_end(&mut all).await.unwrap();
        assert_eq!(all, content);
    }

    #[derive(Debug)]
    struct Broken;

    impl AsyncRead for Broken {
        fn poll_read(self: Pin<&mut Self>, _: &mut Context<'_>, _: &mut [u8]) -> Poll<std::io::Result<usize>> {
            Poll::Ready(Err(std::io::Error::other("unplugged")))
        }
    }

    #[rstest]
    #[case("")]
    #[case("song.ogg")]
    #[tokio::test]
    async fn failing_reader_is_a_get_bytes_error(#[case] filename: &str) {
        let err = detector().detect_async_reader(filename, Broken).await.unwrap_err();
        assert_eq!(*err, ErrorKind::GetBytes);
    }
}
