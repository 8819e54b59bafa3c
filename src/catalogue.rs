use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use serde::Deserialize;
use url::Url;

use crate::download::DownloadClient;
use crate::error::Error;
use crate::options::CatalogueConfig;

/// Largest page the catalogue hands out.
pub const VIDEOS_PER_PAGE: usize = 100;

/// A recorded broadcast as listed by the catalogue.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawVideo")]
pub struct Video {
    pub url: String,
    pub id: String,
    pub channel_id: String,
    pub channel_name: String,
    pub title: String,
    pub description: String,
    pub recorded_at: String,
    /// Seconds.
    pub length: u64,
}

impl Video {
    /// Id as the playlist service expects it: digits only.
    pub fn numeric_id(&self) -> &str {
        self.id.trim_start_matches(['v', 'b'])
    }
}

#[derive(Deserialize)]
struct RawChannel {
    name: String,
    display_name: String,
}

#[derive(Deserialize)]
struct RawVideo {
    url: String,
    #[serde(rename = "_id")]
    id: String,
    channel: RawChannel,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    recorded_at: String,
    length: u64,
}

impl From<RawVideo> for Video {
    fn from(raw: RawVideo) -> Self {
        Self {
            url: raw.url,
            id: raw.id,
            channel_id: raw.channel.name,
            channel_name: raw.channel.display_name,
            title: raw.title.unwrap_or_default(),
            description: raw.description.unwrap_or_default(),
            recorded_at: raw.recorded_at,
            length: raw.length,
        }
    }
}

#[derive(Deserialize)]
struct VideoPage {
    videos: Vec<Video>,
}

pub struct CatalogueClient {
    client: DownloadClient,
    api_url: Url,
}

impl CatalogueClient {
    pub fn new(config: &CatalogueConfig, timeout: std::time::Duration) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.twitchtv.v3+json"));
        let client_id = HeaderValue::from_str(&config.client_id)
            .map_err(|_| Error::Config("client id is not a valid header value".into()))?;
        headers.insert("Client-ID", client_id);

        Ok(Self {
            client: DownloadClient::new(&config.user_agent, timeout, headers)?,
            api_url: config.api_url.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, Error> {
        self.api_url
            .join(path)
            .map_err(|err| Error::Config(format!("bad catalogue endpoint {}: {}", path, err)))
    }

    pub async fn get_video(&self, id: &str) -> Result<Video, Error> {
        let url = self.endpoint(&format!("kraken/videos/{}", id))?;
        self.client.download_json(&url, &[]).await
    }

    /// Broadcasts of `channel`, newest first. With `last_video`, listing stops
    /// right before that video.
    pub async fn get_videos(&self, channel: &str, last_video: Option<&str>, legacy_mode: bool) -> Result<Vec<Video>, Error> {
        let url = self.endpoint(&format!("kraken/channels/{}/videos", channel))?;
        let mut videos = Vec::new();

        for page_number in 0.. {
            let query = [
                ("limit", VIDEOS_PER_PAGE.to_string()),
                ("offset", (page_number * VIDEOS_PER_PAGE).to_string()),
                ("broadcasts", "true".to_string()),
                ("hls", (!legacy_mode).to_string()),
            ];
            let page: VideoPage = self.client.download_json(&url, &query).await?;
            tracing::debug!("catalogue page {} of {}: {} videos", page_number, channel, page.videos.len());

            if page.videos.is_empty() {
                break;
            }

            for video in page.videos {
                if last_video == Some(video.id.as_str()) {
                    return Ok(videos);
                }
                videos.push(video);
            }
        }

        Ok(videos)
    }
}
