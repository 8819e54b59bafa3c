use std::num::NonZeroU32;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use url::Url;

use vod_uploader::options::{CatalogueConfig, Options, Privacy, SplitOptions, UploadConfig};
use vod_uploader::pipeline::Pipeline;
use vod_uploader::retry::RetryPolicy;

#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    #[clap(subcommand)]
    subcmd: SubCmd,

    #[clap(short, long)]
    /// log every segment request
    verbose: bool,

    #[clap(long, env = "TWITCH_CLIENT_ID")]
    /// client id sent to the catalogue and playlist services
    client_id: String,

    #[clap(long, env = "YOUTUBE_ACCESS_TOKEN", hide_env_values = true)]
    /// OAuth access token of the target video platform
    access_token: String,

    #[clap(long, value_delimiter = ',')]
    /// extra tags for every uploaded video
    tags: Vec<String>,

    #[clap(long)]
    /// do not add the built-in tag list
    dont_use_default_tags: bool,

    #[clap(long, default_value_t = SplitOptions::DEFAULT_MAX_DURATION)]
    /// split recordings longer than this many seconds
    split_at: f64,

    #[clap(long)]
    /// split recordings larger than this many bytes
    split_size: Option<u64>,

    #[clap(long)]
    /// upload split parts without grouping them into a playlist
    dont_use_playlist: bool,

    #[clap(long)]
    /// list recordings without the HLS flag
    twitch_legacy_mode: bool,

    #[clap(long)]
    /// index and split recordings but upload nothing
    dry_run: bool,

    #[clap(long, default_value_t = 12.1)]
    /// seconds between attempts of a failed segment request
    retry_delay: f64,

    #[clap(long)]
    /// give up on a segment after this many attempts; unlimited by default
    retry_attempts: Option<NonZeroU32>,

    #[clap(long, default_value = "3")]
    /// attempts of a whole upload before the video is abandoned
    upload_attempts: NonZeroU32,

    #[clap(long, value_enum, default_value = "public")]
    privacy: Privacy,

    #[clap(long, default_value = "20")]
    /// category id of uploaded videos
    category: String,

    #[clap(long, default_value = "64")]
    /// upload chunk size in mega bytes
    chunk_size: usize,

    #[clap(long, default_value_t = 12.1)]
    /// per-attempt timeout of catalogue, playlist and segment requests, in seconds
    timeout: f64,

    #[clap(long, default_value = "https://api.twitch.tv/", value_parser = url_parser)]
    api_url: Url,

    #[clap(long, default_value = "https://usher.ttvnw.net/", value_parser = url_parser)]
    usher_url: Url,

    #[clap(long, default_value = "https://www.googleapis.com/youtube/v3/", value_parser = url_parser)]
    upload_api_url: Url,

    #[clap(long, default_value = "https://www.googleapis.com/upload/youtube/v3/videos", value_parser = url_parser)]
    upload_url: Url,
}

#[derive(Subcommand, Debug)]
enum SubCmd {
    /// Upload every broadcast of a channel, oldest first
    Channel {
        channel: String,

        #[clap(long, conflicts_with = "state_file")]
        /// only upload videos newer than this id
        start_after: Option<String>,

        #[clap(long)]
        /// remembers the last uploaded video between runs
        state_file: Option<PathBuf>,
    },
    /// Upload a single broadcast
    Video {
        /// video id, e.g. v123456
        id: String,
    },
}

fn url_parser(url: &str) -> Result<Url, String> {
    if !url.starts_with("http") {
        return Err("URL must start with http or https".to_string());
    }
    Url::parse(url).map_err(|err| err.to_string())
}

impl Args {
    fn options(&self) -> Options {
        let delay = Duration::from_secs_f64(self.retry_delay.max(0.0));
        let request_timeout = Duration::from_secs_f64(self.timeout.max(0.0));
        let state_file = match &self.subcmd {
            SubCmd::Channel { state_file, .. } => state_file.clone(),
            SubCmd::Video { .. } => None,
        };

        Options {
            catalogue: CatalogueConfig {
                api_url: self.api_url.clone(),
                usher_url: self.usher_url.clone(),
                client_id: self.client_id.clone(),
                user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
            },
            upload: UploadConfig {
                api_url: self.upload_api_url.clone(),
                upload_url: self.upload_url.clone(),
                access_token: self.access_token.clone(),
                category: self.category.clone(),
                privacy: self.privacy,
                chunk_size: self.chunk_size * 1024 * 1024,
                max_retries: 10,
                backoff_unit: Duration::from_secs(1),
                timeout: request_timeout.max(Duration::from_secs(60)),
            },
            split: SplitOptions {
                max_duration: Some(self.split_at),
                max_size: self.split_size,
            },
            retry: RetryPolicy { max_attempts: self.retry_attempts, delay },
            upload_retry: RetryPolicy::bounded(self.upload_attempts, Duration::from_secs(60)),
            request_timeout,
            tags: self.tags.clone(),
            use_default_tags: !self.dont_use_default_tags,
            use_playlist: !self.dont_use_playlist,
            legacy_mode: self.twitch_legacy_mode,
            dry_run: self.dry_run,
            state_file,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if args.verbose {
            "vod_uploader=debug".to_string()
        } else {
            "vod_uploader=info".to_string()
        }
    });
    tracing_subscriber::fmt().with_env_filter(&env_filter).init();

    let options = args.options();
    tracing::debug!("options: {:?}", options.split);
    let pipeline = Pipeline::new(options)?;

    match args.subcmd {
        SubCmd::Channel { channel, start_after, .. } => {
            pipeline.process_channel(&channel, start_after).await?;
            tracing::info!("finished channel {}", channel);
        }
        SubCmd::Video { id } => {
            let ids = pipeline.process_video_id(&id).await?;
            tracing::info!("finished {}: uploaded as {:?}", id, ids);
        }
    }

    Ok(())
}
