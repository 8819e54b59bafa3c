#![allow(dead_code)]

use std::num::NonZeroU32;
use std::time::Duration;

use url::Url;
use vod_uploader::download::playlist::Segment;
use vod_uploader::download::transport::{HttpSettings, HttpTransport};
use vod_uploader::options::{CatalogueConfig, Options, Privacy, SplitOptions, UploadConfig};
use vod_uploader::retry::RetryPolicy;

pub fn settings() -> HttpSettings {
    HttpSettings { user_agent: "vod_uploader-tests".into(), timeout: Duration::from_secs(5) }
}

pub fn transport() -> HttpTransport {
    HttpTransport::new(settings()).unwrap()
}

/// Deterministic body of segment `i`.
pub fn body(i: usize, len: usize) -> Vec<u8> {
    (0..len).map(|b| (i * 31 + b) as u8).collect()
}

/// Path and query of segment `i`, with its byte range spelled out.
pub fn segment_path(i: usize, offset: usize, len: usize) -> String {
    format!("/segments/{}.ts?start_offset={}&end_offset={}", i, offset, offset + len - 1)
}

/// Segments of the given byte lengths and durations, served under `server`.
pub fn segments(server: &str, layout: &[(usize, f64)]) -> Vec<Segment> {
    let mut offset = 0;
    layout
        .iter()
        .enumerate()
        .map(|(i, &(len, duration))| {
            let uri = Url::parse(&format!("{}{}", server, segment_path(i, offset, len))).unwrap();
            offset += len;
            Segment::new(uri, duration)
        })
        .collect()
}

pub fn upload_config(server: &str) -> UploadConfig {
    let base = Url::parse(&format!("{}/", server)).unwrap();
    UploadConfig {
        api_url: base.join("youtube/v3/").unwrap(),
        upload_url: base.join("upload/youtube/v3/videos").unwrap(),
        access_token: "secret".into(),
        category: "20".into(),
        privacy: Privacy::Unlisted,
        chunk_size: 1024,
        max_retries: 3,
        backoff_unit: Duration::ZERO,
        timeout: Duration::from_secs(5),
    }
}

pub fn options(server: &str) -> Options {
    let base = Url::parse(&format!("{}/", server)).unwrap();
    Options {
        catalogue: CatalogueConfig {
            api_url: base.clone(),
            usher_url: base,
            client_id: "client".into(),
            user_agent: "vod_uploader-tests".into(),
        },
        upload: upload_config(server),
        split: SplitOptions { max_duration: Some(SplitOptions::DEFAULT_MAX_DURATION), max_size: None },
        retry: RetryPolicy::bounded(NonZeroU32::new(2).unwrap(), Duration::ZERO),
        upload_retry: RetryPolicy::bounded(NonZeroU32::new(1).unwrap(), Duration::ZERO),
        request_timeout: Duration::from_secs(5),
        tags: vec![],
        use_default_tags: false,
        use_playlist: true,
        legacy_mode: false,
        dry_run: false,
        state_file: None,
    }
}
