//! Resumable video uploads.
//!
//! An upload opens a session with the video's metadata, then sends the media
//! in chunks with `Content-Range` headers. The server answers `308` while it
//! wants more and hands back the new video's id once the last byte arrived.
//! Interrupted chunks are resumed from whatever the server reports as
//! received.

use std::io::{Read, Seek, SeekFrom};
use std::time::Duration;

use rand::Rng;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{CONTENT_RANGE, LOCATION, RANGE};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;
use url::Url;

use crate::error::transport_error::Transient;
use crate::options::{Privacy, UploadConfig};

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("could not build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("server answered {status}: {body}")]
    Status { status: u16, body: String },

    #[error("server did not return an upload session")]
    MissingLocation,

    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("reading the media failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("no longer retrying after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<UploadError>,
    },
}

impl UploadError {
    /// Worth repeating the same chunk request.
    fn is_retriable(&self) -> bool {
        match self {
            Self::Request(_) => true,
            Self::Status { status, .. } => matches!(status, 500 | 502 | 503 | 504),
            _ => false,
        }
    }
}

impl Transient for UploadError {
    /// Worth restarting the whole upload.
    fn is_transient(&self) -> bool {
        matches!(self, Self::Request(_) | Self::Status { .. } | Self::RetriesExhausted { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UploadMetadata {
    pub title: String,
    pub description: String,
    pub category: String,
    pub tags: Vec<String>,
    pub privacy: Privacy,
}

impl UploadMetadata {
    pub fn new(title: String, description: &str, category: String, tags: Vec<String>, privacy: Privacy) -> Self {
        // angle brackets are rejected in descriptions
        let description = description.replace('<', "}").replace('>', "{");
        Self { title, description, category, tags, privacy }
    }

    fn body(&self) -> VideoResource<'_> {
        VideoResource {
            snippet: Snippet {
                title: &self.title,
                description: Some(self.description.as_str()).filter(|d| !d.is_empty()),
                category_id: Some(self.category.as_str()).filter(|c| !c.is_empty()),
                tags: &self.tags,
            },
            status: Status { privacy_status: self.privacy.as_str() },
        }
    }
}

#[derive(Serialize)]
struct VideoResource<'a> {
    snippet: Snippet<'a>,
    status: Status,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Snippet<'a> {
    title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    category_id: Option<&'a str>,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    tags: &'a [String],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Status {
    privacy_status: &'static str,
}

#[derive(Deserialize)]
struct Created {
    id: String,
}

enum Progress {
    /// Offset of the next byte the server wants.
    Resume(u64),
    Done(String),
}

pub struct Uploader {
    client: Client,
    config: UploadConfig,
}

impl Uploader {
    pub fn new(config: UploadConfig) -> Result<Self, UploadError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(UploadError::Client)?;

        Ok(Self { client, config })
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.bearer_auth(&self.config.access_token)
    }

    fn checked(response: Response) -> Result<Response, UploadError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().unwrap_or_default();
        Err(UploadError::Status { status: status.as_u16(), body })
    }

    fn backoff(&self, retry: u32) -> Duration {
        let max = self.config.backoff_unit.mul_f64(2f64.powi(retry as i32));
        max.mul_f64(rand::thread_rng().gen::<f64>())
    }

    /// Runs `attempt` until it succeeds or fails in a way retrying won't fix.
    fn with_retries<T>(&self, what: &str, mut attempt: impl FnMut() -> Result<T, UploadError>) -> Result<T, UploadError> {
        let mut retry = 0;
        loop {
            match attempt() {
                Err(err) if err.is_retriable() => {
                    retry += 1;
                    if retry > self.config.max_retries {
                        return Err(UploadError::RetriesExhausted { attempts: retry, source: Box::new(err) });
                    }
                    let sleep = self.backoff(retry);
                    tracing::warn!("{} failed: {}; retrying in {:.1}s", what, err, sleep.as_secs_f64());
                    std::thread::sleep(sleep);
                }
                result => return result,
            }
        }
    }

    /// Uploads everything `source` holds and returns the new video's id.
    pub fn upload<R: Read + Seek>(&self, source: &mut R, metadata: &UploadMetadata) -> Result<String, UploadError> {
        let total = source.seek(SeekFrom::End(0))?;
        let session = self.with_retries("upload session", || self.start_session(metadata, total))?;
        tracing::info!("uploading {:?} ({} bytes)", metadata.title, total);

        let mut buf = vec![0u8; self.config.chunk_size.max(1)];
        let mut offset = 0;
        let mut retry = 0;

        loop {
            let (progress, after_failure) = match self.put_chunk(&session, source, offset, total, &mut buf) {
                Err(err) if err.is_retriable() => {
                    self.wait_for_retry(&mut retry, err, offset)?;
                    match self.query_progress(&session, total) {
                        Err(err) if err.is_retriable() => continue,
                        other => (other?, true),
                    }
                }
                other => (other?, false),
            };

            match progress {
                Progress::Done(id) => {
                    tracing::info!("uploaded {:?} as {}", metadata.title, id);
                    return Ok(id);
                }
                Progress::Resume(next) if next > total => {
                    return Err(UploadError::UnexpectedResponse(format!(
                        "server claims {} bytes of a {} byte upload",
                        next, total
                    )));
                }
                Progress::Resume(next) if next > offset => {
                    tracing::debug!("server has {} of {} bytes", next, total);
                    retry = 0;
                    offset = next;
                }
                Progress::Resume(next) => {
                    offset = next;
                    // a failed chunk has already been counted and waited for
                    if !after_failure {
                        let stalled = UploadError::UnexpectedResponse(format!("upload stalled at byte {}", next));
                        self.wait_for_retry(&mut retry, stalled, offset)?;
                    }
                }
            }
        }
    }

    /// Counts one more retry of the chunk at `offset` and sleeps before it,
    /// or gives up with `err` once `max_retries` is used up.
    fn wait_for_retry(&self, retry: &mut u32, err: UploadError, offset: u64) -> Result<(), UploadError> {
        *retry += 1;
        if *retry > self.config.max_retries {
            return Err(UploadError::RetriesExhausted { attempts: *retry, source: Box::new(err) });
        }
        let sleep = self.backoff(*retry);
        tracing::warn!("chunk at {} failed: {}; retrying in {:.1}s", offset, err, sleep.as_secs_f64());
        std::thread::sleep(sleep);
        Ok(())
    }

    fn start_session(&self, metadata: &UploadMetadata, total: u64) -> Result<Url, UploadError> {
        let request = self
            .client
            .post(self.config.upload_url.as_str())
            .query(&[("uploadType", "resumable"), ("part", "snippet,status")])
            .header("X-Upload-Content-Length", total)
            .header("X-Upload-Content-Type", "video/*")
            .json(&metadata.body());

        let response = Self::checked(self.authorized(request).send()?)?;
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(UploadError::MissingLocation)?;

        // relative locations resolve against the endpoint
        self.config
            .upload_url
            .join(location)
            .map_err(|_| UploadError::UnexpectedResponse(format!("bad session location {:?}", location)))
    }

    fn put_chunk<R: Read + Seek>(
        &self,
        session: &Url,
        source: &mut R,
        offset: u64,
        total: u64,
        buf: &mut [u8],
    ) -> Result<Progress, UploadError> {
        let len = total.saturating_sub(offset).min(buf.len() as u64) as usize;
        source.seek(SeekFrom::Start(offset))?;
        source.read_exact(&mut buf[..len])?;

        let range = if len == 0 {
            format!("bytes */{}", total)
        } else {
            format!("bytes {}-{}/{}", offset, offset + len as u64 - 1, total)
        };

        let request = self
            .client
            .put(session.as_str())
            .header(CONTENT_RANGE, range)
            .body(buf[..len].to_vec());
        self.progress(self.authorized(request).send()?)
    }

    /// Asks the server how much of the upload it already has.
    fn query_progress(&self, session: &Url, total: u64) -> Result<Progress, UploadError> {
        let request = self
            .client
            .put(session.as_str())
            .header(CONTENT_RANGE, format!("bytes */{}", total))
            .body(Vec::new());
        self.progress(self.authorized(request).send()?)
    }

    fn progress(&self, response: Response) -> Result<Progress, UploadError> {
        if response.status() == StatusCode::PERMANENT_REDIRECT {
            let next = response
                .headers()
                .get(RANGE)
                .and_then(|value| value.to_str().ok())
                .and_then(received_until)
                .map_or(0, |last| last + 1);
            return Ok(Progress::Resume(next));
        }

        let response = Self::checked(response)?;
        let created: Created = response
            .json()
            .map_err(|err| UploadError::UnexpectedResponse(format!("no video id in response: {}", err)))?;
        Ok(Progress::Done(created.id))
    }

    fn api(&self, path: &str) -> Result<Url, UploadError> {
        self.config
            .api_url
            .join(path)
            .map_err(|err| UploadError::UnexpectedResponse(format!("bad api endpoint {}: {}", path, err)))
    }

    pub fn create_playlist(&self, title: &str, description: &str, privacy: Privacy) -> Result<String, UploadError> {
        let url = self.api("playlists")?;
        let body = json!({
            "snippet": { "title": title, "description": description },
            "status": { "privacyStatus": privacy.as_str() },
        });

        let created: Created = self.with_retries("playlist creation", || {
            let request = self
                .client
                .post(url.as_str())
                .query(&[("part", "snippet,status")])
                .json(&body);
            Ok(Self::checked(self.authorized(request).send()?)?.json()?)
        })?;
        tracing::info!("created playlist {:?} ({})", title, created.id);
        Ok(created.id)
    }

    pub fn add_to_playlist(&self, playlist_id: &str, video_id: &str) -> Result<(), UploadError> {
        let url = self.api("playlistItems")?;
        let body = json!({
            "snippet": {
                "playlistId": playlist_id,
                "resourceId": { "kind": "youtube#video", "videoId": video_id },
            },
        });

        self.with_retries("playlist insertion", || {
            let request = self.client.post(url.as_str()).query(&[("part", "snippet")]).json(&body);
            Self::checked(self.authorized(request).send()?)?;
            Ok(())
        })
    }
}

/// Last received byte from a `Range: bytes=0-N` header.
fn received_until(range: &str) -> Option<u64> {
    range.trim().strip_prefix("bytes=")?.split_once('-')?.1.trim().parse().ok()
}
