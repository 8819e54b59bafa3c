use std::path::Path;
use std::sync::Arc;

use crate::catalogue::{CatalogueClient, Video};
use crate::download::playlist::segment::{format_time, Segment};
use crate::download::playlist::PlaylistClient;
use crate::download::transport::{HttpSettings, HttpTransport};
use crate::error::{Error, Result};
use crate::options::{Options, Privacy};
use crate::retry::RetryError;
use crate::upload::{UploadError, UploadMetadata, Uploader};
use crate::vod::VirtualFile;

pub fn video_title(video: &Video, part_number: Option<usize>) -> String {
    let mut title = format!("{} stream from {}", video.channel_name, video.recorded_at);
    if let Some(part_number) = part_number {
        title += &format!(" part {}", part_number);
    }
    title
}

pub fn video_description(video: &Video) -> String {
    format!(
        "Original title: {}\nOriginal description: {}\nOriginal date: {}\nOriginal Twitch id: {}",
        video.title, video.description, video.recorded_at, video.id
    )
}

/// Where a channel run picks up: the id stored in the state file, or the one
/// given on the command line. Both at once is a mistake.
pub async fn resume_point(state_file: Option<&Path>, start_after: Option<String>) -> Result<Option<String>> {
    match (state_file, start_after) {
        (Some(_), Some(_)) => Err(Error::Config(
            "provided both a state file and a video to start after".into(),
        )),
        (Some(path), None) => match tokio::fs::read_to_string(path).await {
            Ok(content) => Ok(content.lines().next().map(str::to_string).filter(|id| !id.is_empty())),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        },
        (None, start_after) => Ok(start_after),
    }
}

pub struct Pipeline {
    options: Arc<Options>,
    catalogue: CatalogueClient,
    playlists: PlaylistClient,
}

impl Pipeline {
    pub fn new(options: Options) -> Result<Self> {
        let catalogue = CatalogueClient::new(&options.catalogue, options.request_timeout)?;
        let playlists = PlaylistClient::new(&options.catalogue, options.request_timeout)?;

        Ok(Self { options: Arc::new(options), catalogue, playlists })
    }

    /// Uploads every broadcast of `channel` newer than the resume point,
    /// oldest first.
    pub async fn process_channel(&self, channel: &str, start_after: Option<String>) -> Result<()> {
        let start_after = resume_point(self.options.state_file.as_deref(), start_after).await?;
        if let Some(id) = &start_after {
            tracing::info!("processing videos of {} after {}", channel, id);
        }

        let mut videos = self
            .catalogue
            .get_videos(channel, start_after.as_deref(), self.options.legacy_mode)
            .await?;
        videos.reverse();
        tracing::info!("{} videos to process", videos.len());

        for video in videos {
            self.process_video(&video).await?;
        }

        Ok(())
    }

    pub async fn process_video_id(&self, id: &str) -> Result<Vec<String>> {
        let video = self.catalogue.get_video(id).await?;
        self.process_video(&video).await
    }

    /// Streams one recording to the video platform, in parts if it is too
    /// long. Returns the ids of the uploaded videos.
    pub async fn process_video(&self, video: &Video) -> Result<Vec<String>> {
        tracing::info!("processing {} ({}, {})", video.id, video.title, format_time(video.length as f64));
        let segments = self.playlists.source_segments(video.numeric_id()).await?;

        let options = Arc::clone(&self.options);
        let owned = video.clone();
        let ids = tokio::task::spawn_blocking(move || upload_recording(&owned, segments, &options)).await??;

        if let Some(state_file) = &self.options.state_file {
            if !self.options.dry_run {
                tokio::fs::write(state_file, format!("{}\n", video.id)).await?;
            }
        }

        tracing::info!("done with {}", video.id);
        Ok(ids)
    }
}

/// Indexes the recording, splits it when needed and uploads the parts.
/// Blocking.
pub fn upload_recording(video: &Video, segments: Vec<Segment>, options: &Options) -> Result<Vec<String>> {
    let transport = HttpTransport::new(HttpSettings {
        user_agent: options.catalogue.user_agent.clone(),
        timeout: options.request_timeout,
    })?;
    let mut file = VirtualFile::open(segments, transport, options.retry)?;
    tracing::info!(
        "{} is {} bytes, {} long",
        video.id,
        file.total_size(),
        format_time(file.total_duration())
    );

    let (max_size, max_duration) = (options.split.max_size, options.split.max_duration);
    let plan = file.split(max_size, max_duration).plan();

    if options.dry_run {
        for (i, range) in plan.iter().enumerate() {
            let size: u64 = range.clone().map(|s| file.index().segment_size(s)).sum();
            let duration: f64 = file.segments()[range.clone()].iter().map(|s| s.duration).sum();
            tracing::info!(
                "would upload part {} of {}: segments {:?}, {} bytes, {}",
                i + 1,
                plan.len(),
                range,
                size,
                format_time(duration)
            );
        }
        return Ok(Vec::new());
    }

    let uploader = Uploader::new(options.upload.clone())?;
    let tags = options.tags();
    let metadata = |part_number| {
        UploadMetadata::new(
            video_title(video, part_number),
            &video_description(video),
            options.upload.category.clone(),
            tags.clone(),
            options.upload.privacy,
        )
    };

    match plan.len() {
        0 => return Err(Error::NoStream(video.id.clone())),
        1 => return Ok(vec![upload_with_restarts(&uploader, &mut file, &metadata(None), options)?]),
        _ => {}
    }

    tracing::info!("splitting {} into {} parts", video.id, plan.len());
    let playlist_id = if options.use_playlist {
        Some(uploader.create_playlist(&video_title(video, None), "", Privacy::Public)?)
    } else {
        None
    };

    // parts are opened one at a time, each with its own session
    let mut ids = Vec::with_capacity(plan.len());
    for (i, part) in file.split(max_size, max_duration).enumerate() {
        let mut part = part?;
        let id = upload_with_restarts(&uploader, &mut part, &metadata(Some(i + 1)), options)?;
        if let Some(playlist_id) = &playlist_id {
            uploader.add_to_playlist(playlist_id, &id)?;
        }
        ids.push(id);
    }

    Ok(ids)
}

fn upload_with_restarts<R: std::io::Read + std::io::Seek>(
    uploader: &Uploader,
    source: &mut R,
    metadata: &UploadMetadata,
    options: &Options,
) -> Result<String> {
    options
        .upload_retry
        .run("upload", || uploader.upload(&mut *source, metadata))
        .map_err(|err| match err {
            RetryError::Fatal(err) => err.into(),
            RetryError::Exhausted(exhausted) => UploadError::RetriesExhausted {
                attempts: exhausted.attempts,
                source: Box::new(exhausted.last_error),
            }
            .into(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video() -> Video {
        Video {
            url: "https://www.twitch.tv/somebody/v42".into(),
            id: "v42".into(),
            channel_id: "somebody".into(),
            channel_name: "Somebody".into(),
            title: "Marathon".into(),
            description: "All night".into(),
            recorded_at: "2016-05-01T20:00:00Z".into(),
            length: 3600,
        }
    }

    #[test]
    fn titles() {
        assert_eq!(video_title(&video(), None), "Somebody stream from 2016-05-01T20:00:00Z");
        assert_eq!(
            video_title(&video(), Some(2)),
            "Somebody stream from 2016-05-01T20:00:00Z part 2"
        );
    }

    #[test]
    fn description_mentions_the_original() {
        let description = video_description(&video());
        assert!(description.contains("Original title: Marathon"));
        assert!(description.ends_with("Original Twitch id: v42"));
    }

    #[tokio::test]
    async fn resume_point_sources() {
        let dir = tempfile::tempdir().unwrap();
        let state = dir.path().join("state");

        assert_eq!(resume_point(None, Some("v1".into())).await.unwrap(), Some("v1".into()));
        assert_eq!(resume_point(Some(state.as_path()), None).await.unwrap(), None);

        std::fs::write(&state, "v7\n").unwrap();
        assert_eq!(resume_point(Some(state.as_path()), None).await.unwrap(), Some("v7".into()));

        assert!(matches!(
            resume_point(Some(state.as_path()), Some("v1".into())).await,
            Err(Error::Config(_))
        ));
    }
}
