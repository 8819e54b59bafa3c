use std::time::Duration;

use bytes::Bytes;
use reqwest::blocking::Client;
use reqwest::header::CONTENT_LENGTH;
use url::Url;

use crate::error::transport_error::TransportError;
use crate::vod::Transport;

#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub user_agent: String,
    /// Per attempt.
    pub timeout: Duration,
}

/// Blocking HTTP client behind a [`crate::vod::VirtualFile`]. Keeps its
/// connections alive across segments.
pub struct HttpTransport {
    client: Client,
    settings: HttpSettings,
}

impl HttpTransport {
    pub fn new(settings: HttpSettings) -> Result<Self, TransportError> {
        let client = Client::builder()
            .user_agent(settings.user_agent.as_str())
            .timeout(settings.timeout)
            .connect_timeout(settings.timeout)
            .build()
            .map_err(TransportError::Client)?;

        Ok(Self { client, settings })
    }

    fn check_status(uri: &Url, response: &reqwest::blocking::Response) -> Result<(), TransportError> {
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(TransportError::Status { url: uri.to_string(), status: status.as_u16() })
        }
    }
}

impl Transport for HttpTransport {
    fn content_length(&self, uri: &Url) -> Result<u64, TransportError> {
        let response = self
            .client
            .head(uri.as_str())
            .send()
            .map_err(|err| TransportError::request(uri, err))?;
        Self::check_status(uri, &response)?;

        // The body of a HEAD response is empty, so the header has to be read
        // directly.
        let Some(value) = response.headers().get(CONTENT_LENGTH) else {
            return Err(TransportError::MissingContentLength { url: uri.to_string() });
        };
        let value = value.to_str().unwrap_or_default();
        value
            .trim()
            .parse::<u64>()
            .map_err(|_| TransportError::InvalidContentLength { url: uri.to_string(), value: value.to_string() })
    }

    fn get(&self, uri: &Url) -> Result<Bytes, TransportError> {
        let response = self
            .client
            .get(uri.as_str())
            .send()
            .map_err(|err| TransportError::request(uri, err))?;
        Self::check_status(uri, &response)?;

        response.bytes().map_err(|err| TransportError::request(uri, err))
    }

    fn new_session(&self) -> Result<Self, TransportError> {
        Self::new(self.settings.clone())
    }
}
