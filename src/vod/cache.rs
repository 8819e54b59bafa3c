use bytes::Bytes;

/// Storage for fetched segments, keyed by their position in the playlist.
pub trait ChunkCache {
    fn get(&self, index: usize) -> Option<Bytes>;
    fn insert(&mut self, index: usize, chunk: Bytes);
}

/// Remembers only the most recently fetched segment. Inserting anything
/// replaces it.
#[derive(Debug, Default)]
pub struct LastChunk {
    slot: Option<(usize, Bytes)>,
}

impl LastChunk {
    pub fn index(&self) -> Option<usize> {
        self.slot.as_ref().map(|(index, _)| *index)
    }
}

impl ChunkCache for LastChunk {
    fn get(&self, index: usize) -> Option<Bytes> {
        match &self.slot {
            Some((cached, chunk)) if *cached == index => Some(chunk.clone()),
            _ => None,
        }
    }

    fn insert(&mut self, index: usize, chunk: Bytes) {
        self.slot = Some((index, chunk));
    }
}
