use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::retry::RetryPolicy;

pub const DEFAULT_TAGS: [&str; 10] = [
    "twitch",
    "stream",
    "vod",
    "vods",
    "broadcast",
    "broadcasts",
    "archive",
    "archives",
    "recording",
    "recordings",
];

/// Everything a run needs, handed to each collaborator at construction.
#[derive(Debug, Clone)]
pub struct Options {
    pub catalogue: CatalogueConfig,
    pub upload: UploadConfig,
    pub split: SplitOptions,
    /// Segment probes and downloads.
    pub retry: RetryPolicy,
    /// Restarts of a whole upload after it failed.
    pub upload_retry: RetryPolicy,
    /// Per-attempt timeout of catalogue, playlist and segment requests.
    pub request_timeout: Duration,
    pub tags: Vec<String>,
    pub use_default_tags: bool,
    pub use_playlist: bool,
    pub legacy_mode: bool,
    pub dry_run: bool,
    pub state_file: Option<PathBuf>,
}

impl Options {
    pub fn tags(&self) -> Vec<String> {
        let defaults = DEFAULT_TAGS
            .iter()
            .filter(|_| self.use_default_tags)
            .map(|tag| tag.to_string());

        defaults
            .chain(self.tags.iter().cloned())
            .filter(|tag| !tag.is_empty())
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct CatalogueConfig {
    pub api_url: Url,
    pub usher_url: Url,
    pub client_id: String,
    pub user_agent: String,
}

#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Base of the data API, e.g. `https://www.googleapis.com/youtube/v3/`.
    pub api_url: Url,
    /// Resumable media upload endpoint.
    pub upload_url: Url,
    pub access_token: String,
    pub category: String,
    pub privacy: Privacy,
    pub chunk_size: usize,
    /// Retries of a single chunk before the upload is abandoned.
    pub max_retries: u32,
    /// Retry `n` sleeps a random fraction of `backoff_unit * 2^n`.
    pub backoff_unit: Duration,
    pub timeout: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Privacy {
    Public,
    Private,
    Unlisted,
}

impl Privacy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
            Self::Unlisted => "unlisted",
        }
    }
}

/// Limits of a single uploaded part. `None` never splits.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SplitOptions {
    pub max_duration: Option<f64>,
    pub max_size: Option<u64>,
}

impl SplitOptions {
    /// Eleven hours.
    pub const DEFAULT_MAX_DURATION: f64 = 60.0 * 60.0 * 11.0;
}
