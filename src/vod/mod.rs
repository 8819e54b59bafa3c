//! Seekable, readable view over the media segments of a recording.
//!
//! A [`VirtualFile`] presents the segments of an HLS playlist as one
//! contiguous byte stream. Segment lengths are learned once up front (from the
//! byte range encoded in the segment URI, or from a `HEAD` probe) and turned
//! into a cumulative [`SegmentIndex`]; reads then map byte offsets onto
//! segments with a binary search and pull whole segments over HTTP through a
//! [`ChunkFetcher`] that remembers the last one it fetched. Nothing is ever
//! written to disk.
//!
//! Everything here is blocking. Callers living on an async runtime should move
//! the file onto the blocking pool.

pub mod cache;
pub mod error;
pub mod fetcher;
pub mod file;
pub mod index;
pub mod partition;

#[cfg(test)]
pub(crate) mod testing;

use bytes::Bytes;
use url::Url;

use crate::error::transport_error::TransportError;

pub use cache::{ChunkCache, LastChunk};
pub use error::Error;
pub use fetcher::ChunkFetcher;
pub use file::{read_limit, VirtualFile, Whence};
pub use index::SegmentIndex;
pub use partition::Partitions;

/// The two HTTP operations the virtual file needs, one attempt each.
/// Retrying is the caller's business.
pub trait Transport {
    /// Declared `Content-Length` of `uri`, from a metadata-only request.
    fn content_length(&self, uri: &Url) -> Result<u64, TransportError>;

    /// Full body of `uri`.
    fn get(&self, uri: &Url) -> Result<Bytes, TransportError>;

    /// A transport with the same settings but its own connection pool.
    fn new_session(&self) -> Result<Self, TransportError>
    where
        Self: Sized;
}
