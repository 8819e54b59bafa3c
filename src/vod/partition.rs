use std::ops::Range;

use super::{Error, Transport, VirtualFile};

/// Consecutive parts of a [`VirtualFile`], produced lazily by
/// [`VirtualFile::split`]. Each call to `split` starts over from the first
/// segment.
pub struct Partitions<'a, T> {
    file: &'a VirtualFile<T>,
    next: usize,
    max_size: Option<u64>,
    max_duration: Option<f64>,
}

impl<'a, T: Transport> Partitions<'a, T> {
    pub(crate) fn new(file: &'a VirtualFile<T>, max_size: Option<u64>, max_duration: Option<f64>) -> Self {
        Self { file, next: 0, max_size, max_duration }
    }

    fn exceeds(&self, size: u64, duration: f64) -> bool {
        self.max_size.is_some_and(|max| size > max)
            || self.max_duration.is_some_and(|max| duration > max)
    }

    /// Segment range of the next part. Opens nothing.
    fn next_range(&mut self) -> Option<Range<usize>> {
        let segments = self.file.segments();
        let index = self.file.index();
        let start = self.next;
        if start >= segments.len() {
            return None;
        }

        let mut end = start;
        let mut size = 0;
        let mut duration = 0.0;
        while end < segments.len() {
            let next_size = size + index.segment_size(end);
            let next_duration = duration + segments[end].duration;
            // An empty part takes the segment whatever its size.
            if end > start && self.exceeds(next_size, next_duration) {
                break;
            }
            size = next_size;
            duration = next_duration;
            end += 1;
        }
        self.next = end;

        tracing::debug!(
            "part of segments {}..{}: {} bytes, {:.1}s",
            start,
            end,
            size,
            duration
        );
        Some(start..end)
    }

    /// Segment ranges of the parts still to come, without opening any of
    /// them.
    pub fn plan(&self) -> Vec<Range<usize>> {
        let mut rest = Self {
            file: self.file,
            next: self.next,
            max_size: self.max_size,
            max_duration: self.max_duration,
        };
        std::iter::from_fn(|| rest.next_range()).collect()
    }
}

impl<T: Transport> Iterator for Partitions<'_, T> {
    type Item = Result<VirtualFile<T>, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        let range = self.next_range()?;
        Some(self.file.part(range))
    }
}

#[cfg(test)]
mod tests {
    use crate::retry::RetryPolicy;
    use crate::vod::testing::{concatenation, content, recording, FakeTransport};
    use crate::vod::VirtualFile;

    fn open(layout: &[(usize, f64)]) -> (VirtualFile<FakeTransport>, FakeTransport) {
        let (segments, transport) = recording(layout, true);
        let file = VirtualFile::open(segments, transport.clone(), RetryPolicy::immediate()).unwrap();
        (file, transport)
    }

    /// Segment names per part.
    fn groups(file: &VirtualFile<FakeTransport>, max_size: Option<u64>, max_duration: Option<f64>) -> Vec<Vec<String>> {
        file.split(max_size, max_duration)
            .map(|part| {
                part.unwrap()
                    .segments()
                    .iter()
                    .map(|segment| segment.name.clone())
                    .collect()
            })
            .collect()
    }

    const EVEN: [(usize, f64); 3] = [(10, 1.0), (10, 1.0), (10, 1.0)];

    #[test]
    fn no_limits_yield_one_part() {
        let (file, _) = open(&EVEN);
        assert_eq!(groups(&file, None, None), vec![vec!["0.ts", "1.ts", "2.ts"]]);
    }

    #[test]
    fn size_limit_between_one_and_two_segments() {
        let (file, _) = open(&EVEN);
        assert_eq!(
            groups(&file, Some(15), None),
            vec![vec!["0.ts"], vec!["1.ts"], vec!["2.ts"]]
        );
    }

    #[test]
    fn size_limit_is_inclusive() {
        let (file, _) = open(&EVEN);
        assert_eq!(groups(&file, Some(20), None), vec![vec!["0.ts", "1.ts"], vec!["2.ts"]]);
    }

    #[test]
    fn duration_limit() {
        let (file, _) = open(&EVEN);
        assert_eq!(groups(&file, None, Some(2.5)), vec![vec!["0.ts", "1.ts"], vec!["2.ts"]]);
    }

    #[test]
    fn either_limit_closes_a_part() {
        let (file, _) = open(&[(5, 1.0), (5, 3.0), (20, 0.5), (5, 1.0)]);
        // duration closes the first part, size the second
        assert_eq!(
            groups(&file, Some(25), Some(3.5)),
            vec![vec!["0.ts"], vec!["1.ts", "2.ts"], vec!["3.ts"]]
        );
    }

    #[test]
    fn oversized_segment_stands_alone() {
        let (file, _) = open(&[(4, 1.0), (50, 1.0), (4, 1.0)]);
        assert_eq!(
            groups(&file, Some(10), None),
            vec![vec!["0.ts"], vec!["1.ts"], vec!["2.ts"]]
        );
        assert_eq!(groups(&file, None, Some(0.5)).len(), 3);
    }

    #[test]
    fn parts_have_their_own_coordinates() {
        let layout = [(10, 1.0), (6, 2.0), (8, 1.0)];
        let (file, _) = open(&layout);

        let mut parts: Vec<_> = file.split(Some(16), None).map(Result::unwrap).collect();

        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].index().offsets(), &[10, 16]);
        assert_eq!(parts[0].index().times(), &[1.0, 3.0]);
        assert_eq!(parts[1].index().offsets(), &[8]);
        assert_eq!(parts[1].total_duration(), 1.0);
        assert_eq!(parts[1].tell(), 0);

        assert_eq!(parts[1].read_span(None).unwrap(), content(2, 8));

        let mut joined = parts[0].read_span(None).unwrap();
        joined.extend(parts[1].read_span(None).unwrap());
        assert_eq!(joined, concatenation(&layout));
    }

    #[test]
    fn every_part_opens_its_own_session() {
        let (file, transport) = open(&EVEN);

        let parts = file.split(Some(10), None).count();

        assert_eq!(parts, 3);
        assert_eq!(transport.state.borrow().sessions, 3);
    }

    #[test]
    fn splitting_again_starts_over() {
        let (file, _) = open(&EVEN);
        let mut partitions = file.split(Some(10), None);
        partitions.next();
        assert_eq!(partitions.count(), 2);

        assert_eq!(file.split(Some(10), None).count(), 3);
    }

    #[test]
    fn plan_opens_no_sessions() {
        let (file, transport) = open(&EVEN);
        let mut partitions = file.split(Some(10), None);

        assert_eq!(partitions.plan(), vec![0..1, 1..2, 2..3]);
        assert_eq!(transport.state.borrow().sessions, 0);

        partitions.next().unwrap().unwrap();
        assert_eq!(transport.state.borrow().sessions, 1);
        assert_eq!(partitions.plan(), vec![1..2, 2..3]);
        assert_eq!(partitions.count(), 2);
    }

    #[test]
    fn empty_recording_has_no_parts() {
        let (file, _) = open(&[]);
        assert_eq!(file.split(None, None).count(), 0);
    }
}
