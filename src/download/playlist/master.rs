use url::Url;

use crate::error::Error;

/// Media group carrying the untranscoded source rendition.
pub const SOURCE_GROUP: &str = "chunked";

/// One `#EXT-X-STREAM-INF` entry of a master playlist.
#[derive(Debug, Clone, PartialEq)]
pub struct Stream {
    pub playlist_url: Url,
    pub bandwidth: u64,
    pub video: Option<String>,
}

/// Splits an attribute list such as `BANDWIDTH=1,CODECS="a,b"` into pairs,
/// unquoting quoted values.
pub fn parse_attributes(list: &str) -> Vec<(String, String)> {
    let mut attributes = Vec::new();
    let mut rest = list.trim();

    while !rest.is_empty() {
        let Some((key, tail)) = rest.split_once('=') else {
            break;
        };

        let (value, tail) = match tail.strip_prefix('"') {
            Some(quoted) => match quoted.split_once('"') {
                Some((value, tail)) => (value, tail),
                None => (quoted, ""),
            },
            None => tail.split_once(',').map_or((tail, ""), |(value, tail)| (value, tail)),
        };

        attributes.push((key.trim().to_string(), value.to_string()));
        rest = tail.trim_start_matches(',').trim_start();
    }

    attributes
}

pub fn parse_playlist_master(playlist: &str, base: &Url) -> Result<Vec<Stream>, Error> {
    let mut streams = Vec::new();
    let mut lines = playlist.lines().map(str::trim);

    while let Some(line) = lines.next() {
        let Some(attributes) = line.strip_prefix("#EXT-X-STREAM-INF:") else {
            continue;
        };

        let mut bandwidth = 0;
        let mut video = None;
        for (key, value) in parse_attributes(attributes) {
            match key.as_str() {
                // Some servers write BANDWIDTH=None; treat anything unparsable
                // as unknown.
                "BANDWIDTH" => bandwidth = value.parse().unwrap_or(1),
                "VIDEO" => video = Some(value),
                _ => {}
            }
        }

        let uri = lines
            .by_ref()
            .find(|line| !line.is_empty() && !line.starts_with('#'))
            .ok_or_else(|| Error::InvalidPlaylist("#EXT-X-STREAM-INF without a uri".into()))?;
        let playlist_url = base
            .join(uri)
            .map_err(|err| Error::InvalidPlaylist(format!("bad variant uri {:?}: {}", uri, err)))?;

        streams.push(Stream { playlist_url, bandwidth, video });
    }

    Ok(streams)
}

/// The source rendition if there is one, the highest bandwidth otherwise.
pub fn select_stream(streams: Vec<Stream>) -> Option<Stream> {
    if let Some(source) = streams
        .iter()
        .find(|stream| stream.video.as_deref() == Some(SOURCE_GROUP))
    {
        return Some(source.clone());
    }

    streams.into_iter().max_by_key(|stream| stream.bandwidth)
}
