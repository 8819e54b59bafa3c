pub mod master;
pub mod segment;

use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::Deserialize;
use url::Url;

use crate::download::DownloadClient;
use crate::error::Error;
use crate::options::CatalogueConfig;

pub use master::{parse_playlist_master, select_stream, Stream};
pub use segment::{parse_segments, Segment};

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AccessToken {
    pub token: String,
    pub sig: String,
}

/// Finds the source-quality segment list of a recording.
pub struct PlaylistClient {
    client: DownloadClient,
    api_url: Url,
    usher_url: Url,
}

impl PlaylistClient {
    pub fn new(config: &CatalogueConfig, timeout: std::time::Duration) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        let client_id = HeaderValue::from_str(&config.client_id)
            .map_err(|_| Error::Config("client id is not a valid header value".into()))?;
        headers.insert("Client-ID", client_id);

        Ok(Self {
            client: DownloadClient::new(&config.user_agent, timeout, headers)?,
            api_url: config.api_url.clone(),
            usher_url: config.usher_url.clone(),
        })
    }

    fn endpoint(base: &Url, path: &str) -> Result<Url, Error> {
        base.join(path)
            .map_err(|err| Error::Config(format!("bad endpoint {}{}: {}", base, path, err)))
    }

    /// `video_id` is the bare number, without the leading `v`.
    pub async fn access_token(&self, video_id: &str) -> Result<AccessToken, Error> {
        let url = Self::endpoint(&self.api_url, &format!("api/vods/{}/access_token", video_id))?;
        let token = self.client.download_json(&url, &[]).await?;
        tracing::debug!("got access token for video {}", video_id);
        Ok(token)
    }

    /// Master playlist text and the url it was served from.
    pub async fn variant_playlist(&self, video_id: &str) -> Result<(String, Url), Error> {
        let token = self.access_token(video_id).await?;
        let url = Self::endpoint(&self.usher_url, &format!("vod/{}", video_id))?;
        let query = [
            ("player", "twitchweb".to_string()),
            ("p", rand::thread_rng().gen_range(0..999_999).to_string()),
            ("type", "any".to_string()),
            ("allow_source", "true".to_string()),
            ("allow_audio_only", "true".to_string()),
            ("nauth", token.token),
            ("nauthsig", token.sig),
        ];

        let text = self.client.download_text(&url, &query).await?;
        Ok((text, url))
    }

    /// Segments of the source rendition, in playback order.
    pub async fn source_segments(&self, video_id: &str) -> Result<Vec<Segment>, Error> {
        let (master, master_url) = self.variant_playlist(video_id).await?;
        let streams = parse_playlist_master(&master, &master_url)?;
        let stream = select_stream(streams).ok_or_else(|| Error::NoStream(video_id.to_string()))?;
        tracing::info!("source playlist for video {} at {}", video_id, stream.playlist_url);

        let playlist = self.client.download_text(&stream.playlist_url, &[]).await?;
        let segments = parse_segments(&playlist, &stream.playlist_url)?;
        tracing::debug!("video {} has {} segments", video_id, segments.len());
        Ok(segments)
    }
}
