use crate::error::transport_error::TransportError;
use crate::retry::RetryError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{uri}: {source}")]
    Fatal {
        uri: String,
        #[source]
        source: TransportError,
    },

    #[error("gave up on {uri} after {attempts} attempts: {source}")]
    RetriesExhausted {
        uri: String,
        attempts: u32,
        #[source]
        source: TransportError,
    },

    #[error("segment {index} is {actual} bytes long, the index expects {expected}")]
    ShortSegment { index: usize, expected: u64, actual: u64 },

    #[error("segment {index} pushes the recording past the largest representable size")]
    TooLarge { index: usize },

    #[error("could not open a new HTTP session: {0}")]
    Session(#[source] TransportError),
}

impl Error {
    pub(crate) fn from_retry(uri: &url::Url, err: RetryError<TransportError>) -> Self {
        match err {
            RetryError::Fatal(source) => Self::Fatal { uri: uri.to_string(), source },
            RetryError::Exhausted(exhausted) => Self::RetriesExhausted {
                uri: uri.to_string(),
                attempts: exhausted.attempts,
                source: exhausted.last_error,
            },
        }
    }
}

impl From<Error> for std::io::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::InvalidArgument(_) => std::io::Error::new(std::io::ErrorKind::InvalidInput, err),
            err => std::io::Error::other(err),
        }
    }
}
