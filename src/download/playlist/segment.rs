use url::Url;

use crate::error::Error;

/// One media segment of a recording, in playback order.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub name: String,
    pub uri: Url,
    /// Nominal duration from `#EXTINF`, in seconds.
    pub duration: f64,
    /// Byte length, when the URI spells out its own byte range.
    pub size_hint: Option<u64>,
}

impl Segment {
    pub fn new(uri: Url, duration: f64) -> Self {
        let name = match uri.path().rsplit_once('/') {
            Some((_, name)) => name.to_string(),
            None => uri.path().to_string(),
        };

        Self {
            name,
            size_hint: byte_range_hint(&uri),
            uri,
            duration,
        }
    }
}

/// Length of the inclusive `start_offset`..`end_offset` range carried in the
/// query string. Values that are not integers are ignored.
pub fn byte_range_hint(uri: &Url) -> Option<u64> {
    let mut start = None;
    let mut end = None;

    for (key, value) in uri.query_pairs() {
        let Ok(value) = value.parse::<u64>() else {
            continue;
        };
        match key.as_ref() {
            "start_offset" => start = Some(value),
            "end_offset" => end = Some(value),
            _ => {}
        }
    }

    end?.checked_sub(start?)?.checked_add(1)
}

/// `hh:mm:ss` rendering of a duration in seconds.
pub fn format_time(seconds: f64) -> String {
    let hours = seconds as i64 / 3600;
    let minutes = (seconds as i64 % 3600) / 60;
    let seconds = seconds as i64 % 60;

    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

/// Parses the segment list of a media playlist. Relative segment URIs are
/// resolved against `base`, the URL the playlist was fetched from.
pub fn parse_segments(playlist: &str, base: &Url) -> Result<Vec<Segment>, Error> {
    let mut segments = Vec::new();
    let mut lines = playlist.lines().map(str::trim);

    while let Some(line) = lines.next() {
        let Some(info) = line.strip_prefix("#EXTINF:") else {
            continue;
        };

        let duration = info.split(',').next().unwrap_or_default().trim();
        let duration = duration
            .parse::<f64>()
            .map_err(|_| Error::InvalidPlaylist(format!("bad segment duration {:?}", duration)))?;
        if !(duration >= 0.0) {
            return Err(Error::InvalidPlaylist(format!("negative segment duration {}", duration)));
        }

        let uri = lines
            .by_ref()
            .find(|line| !line.is_empty() && !line.starts_with('#'))
            .ok_or_else(|| Error::InvalidPlaylist("#EXTINF without a segment uri".into()))?;
        let uri = base
            .join(uri)
            .map_err(|err| Error::InvalidPlaylist(format!("bad segment uri {:?}: {}", uri, err)))?;

        segments.push(Segment::new(uri, duration));
    }

    Ok(segments)
}
