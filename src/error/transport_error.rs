
/// Errors that may go away when the same request is simply sent again.
pub trait Transient {
    fn is_transient(&self) -> bool;
}

/// Failure of a single HTTP attempt.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },

    #[error("{url} did not declare a content length")]
    MissingContentLength { url: String },

    #[error("{url} declared an unusable content length {value:?}")]
    InvalidContentLength { url: String, value: String },

    #[error("could not build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl TransportError {
    pub fn request(url: &url::Url, source: reqwest::Error) -> Self {
        Self::Request { url: url.to_string(), source }
    }
}

impl Transient for TransportError {
    fn is_transient(&self) -> bool {
        // Connection failures, timeouts and error statuses are all worth
        // another attempt; a server that answers 200 without a usable length
        // will keep doing so.
        matches!(self, Self::Request { .. } | Self::Status { .. })
    }
}
