pub mod transport_error;

use transport_error::TransportError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Vod(#[from] crate::vod::Error),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Upload(#[from] crate::upload::UploadError),

    #[error("invalid playlist: {0}")]
    InvalidPlaylist(String),

    #[error("no playable stream for video {0}")]
    NoStream(String),

    #[error("unexpected catalogue response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
