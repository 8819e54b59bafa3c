use super::{Error, Transport};
use crate::download::playlist::segment::Segment;
use crate::retry::RetryPolicy;

/// Cumulative byte offsets and playback times of a segment list.
///
/// `offsets[i]` is the exclusive end of segment `i` in the concatenated
/// stream and `times[i]` the playback time at which it ends.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SegmentIndex {
    offsets: Vec<u64>,
    times: Vec<f64>,
}

impl SegmentIndex {
    /// Learns every segment's length, probing the ones whose URI does not
    /// carry a byte range. Probes are sequential, in playlist order.
    pub fn build<T: Transport>(
        segments: &[Segment],
        transport: &T,
        policy: &RetryPolicy,
    ) -> Result<Self, Error> {
        let mut lengths = Vec::with_capacity(segments.len());

        for (i, segment) in segments.iter().enumerate() {
            let size = match segment.size_hint {
                Some(size) => size,
                None => {
                    tracing::debug!("probing segment {} ({})", i, segment.uri);
                    policy
                        .run("segment probe", || transport.content_length(&segment.uri))
                        .map_err(|err| Error::from_retry(&segment.uri, err))?
                }
            };
            lengths.push((size, segment.duration));
        }

        let index = Self::from_lengths(lengths)?;
        tracing::debug!(
            "indexed {} segments, {} bytes, {:.1}s",
            index.len(),
            index.total_size(),
            index.total_duration()
        );
        Ok(index)
    }

    /// Index over already known `(byte length, duration)` pairs. Fails when
    /// the total size does not fit in a `u64`.
    pub fn from_lengths(lengths: impl IntoIterator<Item = (u64, f64)>) -> Result<Self, Error> {
        let mut index = Self::default();
        let mut size: u64 = 0;
        let mut duration = 0.0;

        for (i, (length, seconds)) in lengths.into_iter().enumerate() {
            size = size.checked_add(length).ok_or(Error::TooLarge { index: i })?;
            duration += seconds;
            index.offsets.push(size);
            index.times.push(duration);
        }

        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn offsets(&self) -> &[u64] {
        &self.offsets
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn total_size(&self) -> u64 {
        self.offsets.last().copied().unwrap_or(0)
    }

    pub fn total_duration(&self) -> f64 {
        self.times.last().copied().unwrap_or(0.0)
    }

    /// First byte of segment `i`.
    pub fn segment_start(&self, i: usize) -> u64 {
        if i == 0 {
            0
        } else {
            self.offsets[i - 1]
        }
    }

    /// One past the last byte of segment `i`.
    pub fn segment_end(&self, i: usize) -> u64 {
        self.offsets[i]
    }

    pub fn segment_size(&self, i: usize) -> u64 {
        self.segment_end(i) - self.segment_start(i)
    }

    /// Segment holding byte `offset`: the first whose cumulative end is
    /// strictly greater, so a boundary offset belongs to the next segment.
    /// `None` at or past the end of the stream.
    pub fn resolve(&self, offset: u64) -> Option<usize> {
        if offset >= self.total_size() {
            return None;
        }
        Some(self.offsets.partition_point(|&end| end <= offset))
    }
}
