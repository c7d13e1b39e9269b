//! Media type detection on top of the shared-mime-info cache.
//!
//! [`Detector`] follows the freedesktop checking order: the filename first,
//! content only when the filename does not settle it, and a text/binary
//! guess when neither does.
//!
//! ```no_run
//! use mimer_detect::Detector;
//!
//! let detector = Detector::open("/usr/share/mime/mime.cache").unwrap();
//! // Never reads the file: the extension is unambiguous.
//! let mime_type = detector.detect_path("notes.txt").unwrap();
//! assert_eq!(mime_type, "text/plain");
//! ```
//!
//! Content is fetched lazily through a caller-supplied byte source, at most
//! once per call and at most [`Detector::max_bytes_needed`] bytes of it.
//! The `async` feature adds [`Detector::detect_async_reader`] for
//! `futures::io::AsyncRead` sources.

mod detector;
pub mod error;
#[cfg(feature = "async")]
mod futures;
pub mod text;

pub use crate::detector::Detector;
pub use crate::text::looks_like_text;
pub use mimer_cache::{MimeCache, OCTET_STREAM, TEXT_PLAIN};
