//! Source fetching module
//!
//! Resolves the playable video URLs and the subtitle tracks of an episode.
//! Both lookups run concurrently and are joined into a single
//! [`SourceDescriptor`].

use crate::language::language_code;
use crate::metadata_retrieval::{EpisodeRecord, MetadataProvider, MetadataRetrievalError, Show};
use crate::stream_selection::{AudioMode, DownloadMode, StreamHandle};
use std::thread;
use thiserror::Error;

/// Label of the pseudo subtitle track carrying seek-bar thumbnails
const THUMBNAILS_LABEL: &str = "Thumbnails";

/// Errors that can occur while fetching sources
#[derive(Debug, Error)]
pub enum FetchError {
    /// The watch endpoint failed for a handle
    #[error("Failed to fetch streams for {handle}: {source}")]
    StreamFetchFailure {
        handle: String,
        #[source]
        source: MetadataRetrievalError,
    },

    /// The watch endpoint answered without a playable source
    #[error("No playable source listed for {handle}")]
    NoSources { handle: String },

    /// A fetch worker panicked
    #[error("The {0} fetch worker panicked")]
    WorkerPanicked(&'static str),
}

/// A resolved video stream
#[derive(Debug, Clone, PartialEq)]
pub struct VideoSource {
    pub url: String,
    pub mode: AudioMode,
}

/// A resolved subtitle track
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleSource {
    /// Label as listed by the site, e.g. `Portuguese - Portuguese(Brazil)`
    pub label: String,
    /// ISO 639-2 code derived from the label
    pub code: String,
    pub url: String,
}

/// Everything needed to download and mux one episode
#[derive(Debug, Clone, PartialEq)]
pub struct SourceDescriptor {
    /// Video streams, in stream handle order (sub before dub)
    pub video_sources: Vec<VideoSource>,
    /// Subtitle tracks, in upstream order
    pub subtitle_sources: Vec<SubtitleSource>,
    pub show_title: String,
    pub show_numeric_id: u64,
    pub season: u32,
    pub episode: usize,
    pub episode_title: String,
}

/// Fetches the video and subtitle sources of an episode
///
/// The video lookup (one request per handle, in order) and the subtitle
/// lookup (one request against the sub variant of the first handle, skipped
/// for dub-only downloads) run on two scoped threads. Both are joined before
/// the result is returned; a failure in either aborts the episode.
pub(crate) fn fetch_sources<P>(
    provider: &P,
    show: &Show,
    episode: &EpisodeRecord,
    season: u32,
    handles: &[StreamHandle],
    requested: DownloadMode,
) -> Result<SourceDescriptor, FetchError>
where
    P: MetadataProvider + ?Sized,
{
    let subtitle_handle = handles
        .first()
        .filter(|_| requested.wants_subtitles())
        .map(StreamHandle::sub_variant);

    let (video_sources, subtitle_sources) = thread::scope(|scope| {
        let video_worker = scope.spawn(|| fetch_video_sources(provider, handles));
        let subtitle_worker = subtitle_handle
            .map(|handle| scope.spawn(move || fetch_subtitle_sources(provider, &handle)));

        // Both workers are joined before either result is inspected
        let videos = video_worker.join();
        let subtitles = subtitle_worker.map(|worker| worker.join());

        let videos = videos.map_err(|_| FetchError::WorkerPanicked("video"))?;
        let subtitles = match subtitles {
            Some(joined) => joined.map_err(|_| FetchError::WorkerPanicked("subtitle"))?,
            None => Ok(Vec::new()),
        };

        Ok::<_, FetchError>((videos?, subtitles?))
    })?;

    tracing::info!(
        episode = episode.number,
        videos = video_sources.len(),
        subtitles = subtitle_sources.len(),
        "fetched episode sources"
    );

    Ok(SourceDescriptor {
        video_sources,
        subtitle_sources,
        show_title: show.title.clone(),
        show_numeric_id: show.numeric_id,
        season,
        episode: episode.number,
        episode_title: episode.title.clone(),
    })
}

/// Resolves the first playable URL of every handle, keeping handle order
fn fetch_video_sources<P>(
    provider: &P,
    handles: &[StreamHandle],
) -> Result<Vec<VideoSource>, FetchError>
where
    P: MetadataProvider + ?Sized,
{
    handles
        .iter()
        .map(|handle| {
            let info = provider
                .fetch_watch_info(handle)
                .map_err(|source| FetchError::StreamFetchFailure {
                    handle: handle.to_string(),
                    source,
                })?;

            let url = info
                .sources
                .into_iter()
                .next()
                .ok_or_else(|| FetchError::NoSources {
                    handle: handle.to_string(),
                })?;

            Ok(VideoSource {
                url,
                mode: handle.mode,
            })
        })
        .collect()
}

/// Lists the subtitle tracks of a handle without the thumbnail pseudo track
fn fetch_subtitle_sources<P>(
    provider: &P,
    handle: &StreamHandle,
) -> Result<Vec<SubtitleSource>, FetchError>
where
    P: MetadataProvider + ?Sized,
{
    let info = provider
        .fetch_watch_info(handle)
        .map_err(|source| FetchError::StreamFetchFailure {
            handle: handle.to_string(),
            source,
        })?;

    Ok(info
        .subtitles
        .into_iter()
        .filter(|track| track.label != THUMBNAILS_LABEL)
        .map(|track| SubtitleSource {
            code: language_code(&track.label).to_string(),
            label: track.label,
            url: track.url,
        })
        .collect())
}
