pub mod playlist;
pub mod transport;

use std::time::Duration;

use bytes::Bytes;
use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::transport_error::TransportError;
use crate::error::Error;

/// Async client for the small metadata requests: catalogue pages, access
/// tokens and playlists. Segment bytes go through [`transport::HttpTransport`].
#[derive(Debug, Clone)]
pub struct DownloadClient {
    client: reqwest::Client,
}

impl DownloadClient {
    pub fn new(user_agent: &str, timeout: Duration, headers: HeaderMap) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(TransportError::Client)?;

        Ok(Self { client })
    }

    pub async fn download(&self, url: &Url, query: &[(&str, String)]) -> Result<Bytes, TransportError> {
        let request = self.client.get(url.as_str()).query(query);

        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => return Err(TransportError::request(url, err)),
        };

        let status = response.status();
        if !status.is_success() {
            tracing::debug!("{} answered {}", url, status);
            return Err(TransportError::Status { url: url.to_string(), status: status.as_u16() });
        }

        response.bytes().await.map_err(|err| TransportError::request(url, err))
    }

    pub async fn download_text(&self, url: &Url, query: &[(&str, String)]) -> Result<String, Error> {
        let bytes = self.download(url, query).await?;
        String::from_utf8(bytes.to_vec())
            .map_err(|err| Error::InvalidPlaylist(format!("{} is not utf-8: {}", url, err)))
    }

    pub async fn download_json<T: DeserializeOwned>(&self, url: &Url, query: &[(&str, String)]) -> Result<T, Error> {
        let bytes = self.download(url, query).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
