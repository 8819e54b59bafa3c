use std::io::{self, Read, Seek, SeekFrom};
use std::ops::Range;

use super::{ChunkFetcher, Error, Partitions, SegmentIndex, Transport};
use crate::download::playlist::segment::Segment;
use crate::retry::RetryPolicy;

/// Reference point of a [`VirtualFile::seek_to`] offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Whence {
    Start,
    Current,
    End,
}

impl TryFrom<i32> for Whence {
    type Error = Error;

    /// The classic `0`/`1`/`2` whence constants.
    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Start),
            1 => Ok(Self::Current),
            2 => Ok(Self::End),
            other => Err(Error::InvalidArgument(format!("unrecognized whence {}", other))),
        }
    }
}

/// Turns a classic read size into a [`VirtualFile::read_span`] limit:
/// `-1` means "to the end", other negative sizes are rejected.
pub fn read_limit(size: i64) -> Result<Option<u64>, Error> {
    match size {
        -1 => Ok(None),
        size if size < 0 => Err(Error::InvalidArgument(format!("read size {}", size))),
        size => Ok(Some(size as u64)),
    }
}

/// A recording's segments read as one file.
pub struct VirtualFile<T> {
    segments: Vec<Segment>,
    index: SegmentIndex,
    fetcher: ChunkFetcher<T>,
    position: u64,
    current_segment: Option<usize>,
}

impl<T: Transport> VirtualFile<T> {
    /// Indexes `segments`, probing the ones of unknown size. The transport is
    /// used for every request this file makes.
    pub fn open(segments: Vec<Segment>, transport: T, policy: RetryPolicy) -> Result<Self, Error> {
        let index = SegmentIndex::build(&segments, &transport, &policy)?;
        Ok(Self::with_index(segments, index, ChunkFetcher::new(transport, policy)))
    }

    pub(crate) fn with_index(segments: Vec<Segment>, index: SegmentIndex, fetcher: ChunkFetcher<T>) -> Self {
        Self {
            segments,
            index,
            fetcher,
            position: 0,
            current_segment: None,
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn index(&self) -> &SegmentIndex {
        &self.index
    }

    pub fn total_size(&self) -> u64 {
        self.index.total_size()
    }

    pub fn total_duration(&self) -> f64 {
        self.index.total_duration()
    }

    pub fn tell(&self) -> u64 {
        self.position
    }

    /// Segment the cursor was last resolved to. `None` at the end of the file.
    pub fn current_segment(&self) -> Option<usize> {
        self.current_segment
    }

    pub fn is_seekable(&self) -> bool {
        true
    }

    pub fn is_readable(&self) -> bool {
        true
    }

    pub fn is_writable(&self) -> bool {
        false
    }

    /// Moves the cursor and returns the new position. Targets past the end
    /// are clamped to the end; targets before the start are rejected and the
    /// cursor stays where it was.
    pub fn seek_to(&mut self, offset: i64, whence: Whence) -> Result<u64, Error> {
        let base = match whence {
            Whence::Start => 0,
            Whence::Current => self.position as i128,
            Whence::End => self.total_size() as i128,
        };
        self.move_to(base + offset as i128)
    }

    fn move_to(&mut self, target: i128) -> Result<u64, Error> {
        if target < 0 {
            return Err(Error::InvalidArgument(format!("seek to negative position {}", target)));
        }

        let position = target.min(self.total_size() as i128) as u64;
        self.position = position;
        self.current_segment = self.index.resolve(position);
        Ok(position)
    }

    /// Reads `size` bytes from the cursor, or everything up to the end with
    /// `None`. Fewer bytes come back only when the end of the file is reached,
    /// and none at all when the cursor already sits there.
    pub fn read_span(&mut self, size: Option<u64>) -> Result<Vec<u8>, Error> {
        let end = match size {
            Some(size) => self.position.saturating_add(size).min(self.total_size()),
            None => self.total_size(),
        };

        let mut result = Vec::with_capacity((end - self.position) as usize);
        self.copy_until(end, |slice| result.extend_from_slice(slice))?;
        Ok(result)
    }

    /// Fills as much of `buf` as the file has left. Returns the byte count.
    pub fn read_into(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        let end = self
            .position
            .saturating_add(buf.len() as u64)
            .min(self.total_size());

        let mut filled = 0;
        self.copy_until(end, |slice| {
            buf[filled..filled + slice.len()].copy_from_slice(slice);
            filled += slice.len();
        })?;
        Ok(filled)
    }

    /// Walks segments from the cursor to `end`, handing each overlapping
    /// slice to `sink` and advancing the cursor past it.
    fn copy_until(&mut self, end: u64, mut sink: impl FnMut(&[u8])) -> Result<(), Error> {
        while self.position < end {
            let Some(i) = self.index.resolve(self.position) else {
                break;
            };
            self.current_segment = Some(i);

            let segment_start = self.index.segment_start(i);
            let segment_end = self.index.segment_end(i);
            let chunk = self.fetcher.fetch(i, &self.segments[i])?;

            let local = (self.position - segment_start) as usize;
            let wanted = (end.min(segment_end) - self.position) as usize;
            let Some(slice) = chunk.get(local..local + wanted) else {
                return Err(Error::ShortSegment {
                    index: i,
                    expected: segment_end - segment_start,
                    actual: chunk.len() as u64,
                });
            };

            sink(slice);
            self.position += wanted as u64;
        }

        self.current_segment = self.index.resolve(self.position);
        Ok(())
    }

    /// Cuts the file into consecutive parts that each stay within `max_size`
    /// bytes and `max_duration` seconds. A single segment above either limit
    /// still becomes a part of its own. Every part starts at offset zero and
    /// opens its own HTTP session.
    pub fn split(&self, max_size: Option<u64>, max_duration: Option<f64>) -> Partitions<'_, T> {
        Partitions::new(self, max_size, max_duration)
    }

    /// Independent file over `range` of this file's segments.
    pub(crate) fn part(&self, range: Range<usize>) -> Result<Self, Error> {
        let index = SegmentIndex::from_lengths(
            range
                .clone()
                .map(|i| (self.index.segment_size(i), self.segments[i].duration)),
        )?;
        let transport = self.fetcher.transport().new_session().map_err(Error::Session)?;
        let fetcher = ChunkFetcher::new(transport, *self.fetcher.policy());

        Ok(Self::with_index(self.segments[range].to_vec(), index, fetcher))
    }
}

impl<T: Transport> Read for VirtualFile<T> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.read_into(buf)?)
    }
}

impl<T: Transport> Seek for VirtualFile<T> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => offset as i128,
            SeekFrom::Current(offset) => self.position as i128 + offset as i128,
            SeekFrom::End(offset) => self.total_size() as i128 + offset as i128,
        };
        Ok(self.move_to(target)?)
    }

    fn stream_position(&mut self) -> io::Result<u64> {
        Ok(self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vod::testing::{concatenation, recording, FakeTransport};

    const LAYOUT: [(usize, f64); 4] = [(10, 2.0), (7, 1.5), (1, 0.5), (12, 4.0)];

    fn open(layout: &[(usize, f64)]) -> (VirtualFile<FakeTransport>, FakeTransport) {
        let (segments, transport) = recording(layout, false);
        let file = VirtualFile::open(segments, transport.clone(), RetryPolicy::immediate()).unwrap();
        (file, transport)
    }

    #[test]
    fn reads_everything_in_order() {
        let (mut file, _) = open(&LAYOUT);

        let data = file.read_span(Some(file.total_size())).unwrap();

        assert_eq!(data.len(), 30);
        assert_eq!(data, concatenation(&LAYOUT));
        assert_eq!(file.tell(), 30);
        assert_eq!(file.current_segment(), None);
    }

    #[test]
    fn reads_across_segment_boundaries() {
        let (mut file, _) = open(&LAYOUT);
        let expected = concatenation(&LAYOUT);

        file.seek_to(8, Whence::Start).unwrap();
        let data = file.read_span(Some(12)).unwrap();

        assert_eq!(data, expected[8..20]);
        assert_eq!(file.tell(), 20);
        assert_eq!(file.current_segment(), Some(3));
    }

    #[test]
    fn small_reads_reuse_the_cached_segment() {
        let (mut file, transport) = open(&LAYOUT);
        let expected = concatenation(&LAYOUT);

        let mut data = Vec::new();
        for _ in 0..10 {
            data.extend(file.read_span(Some(1)).unwrap());
        }

        assert_eq!(data, expected[..10]);
        assert_eq!(transport.gets().len(), 1);
    }

    #[test]
    fn read_is_clamped_to_the_end() {
        let (mut file, _) = open(&LAYOUT);
        let expected = concatenation(&LAYOUT);

        file.seek_to(-5, Whence::End).unwrap();
        let data = file.read_span(Some(100)).unwrap();

        assert_eq!(data, expected[25..]);
        assert!(file.read_span(Some(100)).unwrap().is_empty());
        assert!(file.read_span(None).unwrap().is_empty());
    }

    #[test]
    fn seeking_past_the_end_clamps() {
        let (mut file, transport) = open(&LAYOUT);

        assert_eq!(file.seek_to(130, Whence::Start).unwrap(), 30);
        assert_eq!(file.tell(), 30);
        assert_eq!(file.current_segment(), None);
        assert!(file.read_span(None).unwrap().is_empty());
        assert!(transport.gets().is_empty());
    }

    #[test]
    fn relative_seeks_compose() {
        let (mut file, _) = open(&LAYOUT);

        file.seek_to(5, Whence::Start).unwrap();
        file.seek_to(3, Whence::Current).unwrap();
        assert_eq!(file.tell(), 8);
        assert_eq!(file.current_segment(), Some(0));

        file.seek_to(-20, Whence::End).unwrap();
        assert_eq!(file.tell(), 10);
        assert_eq!(file.current_segment(), Some(1));

        file.seek_to(100, Whence::Current).unwrap();
        file.seek_to(-1, Whence::Current).unwrap();
        assert_eq!(file.tell(), 29);
    }

    #[test]
    fn negative_targets_are_rejected() {
        let (mut file, _) = open(&LAYOUT);
        file.seek_to(4, Whence::Start).unwrap();

        let err = file.seek_to(-5, Whence::Current).unwrap_err();

        assert!(matches!(err, Error::InvalidArgument(_)));
        assert_eq!(file.tell(), 4);
    }

    #[test]
    fn classic_constants() {
        assert_eq!(Whence::try_from(0).unwrap(), Whence::Start);
        assert_eq!(Whence::try_from(2).unwrap(), Whence::End);
        assert!(matches!(Whence::try_from(3), Err(Error::InvalidArgument(_))));

        assert_eq!(read_limit(-1).unwrap(), None);
        assert_eq!(read_limit(0).unwrap(), Some(0));
        assert!(matches!(read_limit(-2), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn capabilities() {
        let (file, _) = open(&LAYOUT);
        assert!(file.is_seekable());
        assert!(file.is_readable());
        assert!(!file.is_writable());
    }

    #[test]
    fn works_as_std_io_reader() {
        let (mut file, _) = open(&LAYOUT);
        let expected = concatenation(&LAYOUT);

        let mut data = Vec::new();
        file.read_to_end(&mut data).unwrap();
        assert_eq!(data, expected);

        assert_eq!(file.seek(SeekFrom::Start(3)).unwrap(), 3);
        let mut buf = [0u8; 9];
        file.read_exact(&mut buf).unwrap();
        assert_eq!(buf[..], expected[3..12]);

        assert_eq!(file.seek(SeekFrom::End(0)).unwrap(), 30);
        assert_eq!(file.read(&mut buf).unwrap(), 0);
        assert_eq!(
            file.seek(SeekFrom::Current(-31)).unwrap_err().kind(),
            io::ErrorKind::InvalidInput
        );
    }

    #[test]
    fn short_segment_bodies_are_reported() {
        let (segments, transport) = recording(&LAYOUT, true);
        transport.serve(&segments[0].uri, vec![1, 2, 3]);
        let mut file = VirtualFile::open(segments, transport, RetryPolicy::immediate()).unwrap();

        assert!(matches!(
            file.read_span(None),
            Err(Error::ShortSegment { index: 0, expected: 10, actual: 3 })
        ));
    }

    #[test]
    fn empty_recording() {
        let (mut file, _) = open(&[]);
        assert_eq!(file.total_size(), 0);
        assert!(file.read_span(None).unwrap().is_empty());
        assert_eq!(file.seek_to(10, Whence::Start).unwrap(), 0);
    }
}
