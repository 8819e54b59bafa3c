use bytes::Bytes;

use super::{ChunkCache, Error, LastChunk, Transport};
use crate::download::playlist::segment::Segment;
use crate::retry::RetryPolicy;

/// Downloads whole segments, going through a cache first.
pub struct ChunkFetcher<T, C = LastChunk> {
    transport: T,
    policy: RetryPolicy,
    cache: C,
}

impl<T: Transport> ChunkFetcher<T> {
    pub fn new(transport: T, policy: RetryPolicy) -> Self {
        Self::with_cache(transport, policy, LastChunk::default())
    }
}

impl<T: Transport, C: ChunkCache> ChunkFetcher<T, C> {
    pub fn with_cache(transport: T, policy: RetryPolicy, cache: C) -> Self {
        Self { transport, policy, cache }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// Content of `segment`, the `index`-th of its playlist.
    pub fn fetch(&mut self, index: usize, segment: &Segment) -> Result<Bytes, Error> {
        if let Some(chunk) = self.cache.get(index) {
            return Ok(chunk);
        }

        tracing::debug!("fetching segment {} ({})", index, segment.uri);
        let transport = &self.transport;
        let chunk = self
            .policy
            .run("segment download", || transport.get(&segment.uri))
            .map_err(|err| Error::from_retry(&segment.uri, err))?;

        self.cache.insert(index, chunk.clone());
        Ok(chunk)
    }
}
