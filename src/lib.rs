//! zoro_dl - Download dual-audio, multi-subtitle episodes from Zoro
//!
//! This library resolves a show's episodes through a metadata API, fetches
//! the video and subtitle sources of every requested episode, downloads them
//! with an external HLS downloader and muxes the result into a single file
//! with ffmpeg.

mod cache;
mod commands;
mod config;
mod episode_range;
mod fetch;
mod language;
mod logging;
mod metadata_retrieval;
mod stream_selection;
mod temp;
mod toolchain;

use commands::{
    SubtitleDownload, build_download_invocations, build_mux_invocation, build_subtitle_downloads,
};
use fetch::fetch_sources;
use metadata_retrieval::{CachedMetadataProvider, MetadataProvider, ZoroProvider, resolve_show};
use stream_selection::select_streams;
use temp::{RunFiles, is_video_file};
use toolchain::{ExternalToolchain, MediaToolchain};

// Re-export error types
pub use cache::CacheError;
pub use commands::CommandBuildError;
pub use config::ConfigError;
pub use episode_range::EpisodeRangeError;
pub use fetch::FetchError;
pub use metadata_retrieval::MetadataRetrievalError;
pub use stream_selection::StreamSelectionError;
pub use toolchain::ToolchainError;

// Re-export configuration and domain types
pub use commands::{language_tag, output_file_name, sanitize_filename, subtitles_tag};
pub use config::{
    Container, DEFAULT_API_URL, DEFAULT_DOWNLOADER, DownloadConfig, Resolution, parse_season,
};
pub use episode_range::EpisodeSelection;
pub use fetch::{SourceDescriptor, SubtitleSource, VideoSource};
pub use logging::init_logging;
pub use metadata_retrieval::{Availability, EpisodeRecord, Show, ShowIdentifier};
pub use stream_selection::{AudioMode, DownloadMode, StreamHandle};
pub use temp::RunToken;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;

/// How long resolved show metadata stays valid in the cache
const METADATA_CACHE_TTL: Duration = Duration::from_secs(6 * 60 * 60);

/// Progress event emitted while downloading
///
/// These events allow library users to track progress and provide feedback
/// while episodes are being processed.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Processing started
    Started { source_url: String, show_id: String },

    /// Resolving show metadata
    FetchingMetadata { show_id: String },

    /// Show metadata resolved
    MetadataResolved { title: String, episode_count: usize },

    /// The episode selection was resolved to concrete episodes
    EpisodesSelected { episodes: Vec<usize> },

    /// Processing a specific episode
    ProcessingEpisode {
        index: usize,
        total: usize,
        episode: usize,
        title: String,
    },

    /// Stream handles selected for the episode
    StreamsSelected { episode: usize, modes: Vec<AudioMode> },

    /// Video and subtitle sources resolved
    SourcesFetched {
        episode: usize,
        video_count: usize,
        subtitle_count: usize,
    },

    /// Downloading one video variant
    DownloadingVideo { episode: usize, mode: AudioMode },

    /// Downloading one subtitle track
    DownloadingSubtitle { episode: usize, language: String },

    /// A subtitle track could not be downloaded and is left out
    SubtitleSkipped {
        episode: usize,
        language: String,
        reason: String,
    },

    /// Muxing the downloaded files
    Muxing { episode: usize, output_path: PathBuf },

    /// Output file written
    Muxed { episode: usize, output_path: PathBuf },

    /// Temporary files of the episode removed
    CleanedUp { episode: usize, removed: usize },

    /// Episode finished
    EpisodeComplete { episode: usize, elapsed: Duration },

    /// All selected episodes processed
    Complete { processed: usize },
}

/// A muxed episode
#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeOutput {
    pub episode: usize,
    pub output_path: PathBuf,
}

/// Failure while processing a single episode, named after the failing stage
#[derive(Debug, Error)]
pub enum EpisodeError {
    /// The requested audio variants are not available
    #[error("Stream selection failed: {0}")]
    StreamSelection(#[from] StreamSelectionError),

    /// Resolving the video or subtitle sources failed
    #[error("Fetching sources failed: {0}")]
    Fetch(#[from] FetchError),

    /// The mux command could not be built
    #[error("Building the mux command failed: {0}")]
    CommandBuild(#[from] CommandBuildError),

    /// Downloading a video variant failed
    #[error("Download failed: {0}")]
    Download(#[source] ToolchainError),

    /// Muxing failed
    #[error("Muxing failed: {0}")]
    Mux(#[source] ToolchainError),
}

/// Top-level error type for zoro_dl operations
#[derive(Debug, Error)]
pub enum ZoroDlError {
    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The source URL does not name a show
    #[error("Invalid source: {0}")]
    InvalidSource(#[source] MetadataRetrievalError),

    /// Show metadata could not be resolved
    #[error("Metadata unavailable for {show}: {source}")]
    MetadataUnavailable {
        show: String,
        #[source]
        source: MetadataRetrievalError,
    },

    /// Invalid or out of range episode selection
    #[error("Episode selection error: {0}")]
    EpisodeRange(#[from] EpisodeRangeError),

    /// An episode failed; processing of the batch stopped there
    #[error("Episode {episode}: {source}")]
    Episode {
        episode: usize,
        #[source]
        source: EpisodeError,
    },

    /// External tools are missing or unusable
    #[error("Toolchain error: {0}")]
    Toolchain(#[from] ToolchainError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Downloads and muxes the configured episodes of a show
///
/// This function resolves the show behind `config.source_url`, selects the
/// requested episodes and, one episode at a time, fetches the sources,
/// downloads every video variant and subtitle track and muxes them into
/// `config.output_dir`. Temporary files of an episode are removed after a
/// successful mux and left in `config.work_dir` when it fails.
///
/// Progress events are emitted through the provided callback, allowing
/// library users to track progress, display status, or remain silent.
///
/// The first failing episode stops the batch.
///
/// # Examples
///
/// ```no_run
/// use zoro_dl::{DownloadConfig, EpisodeSelection, ProgressEvent, download_show};
///
/// let config = DownloadConfig {
///     source_url: "https://hianime.to/watch/spy-x-family-17977".to_string(),
///     episodes: EpisodeSelection::Single(5),
///     ..DownloadConfig::default()
/// };
///
/// let outputs = download_show(&config, |event| {
///     if let ProgressEvent::Muxed { output_path, .. } = event {
///         println!("Wrote {}", output_path.display());
///     }
/// })
/// .unwrap();
/// ```
pub fn download_show<F>(
    config: &DownloadConfig,
    progress_callback: F,
) -> Result<Vec<EpisodeOutput>, ZoroDlError>
where
    F: FnMut(ProgressEvent),
{
    config.validate()?;

    let toolchain = ExternalToolchain::new(
        config.downloader_path.clone(),
        config.ffmpeg_path.clone(),
        config.http_timeout,
    )?;
    toolchain.ensure_available()?;

    let zoro = ZoroProvider::new(&config.api_url, config.server.clone(), config.http_timeout)
        .map_err(|source| ZoroDlError::MetadataUnavailable {
            show: config.source_url.clone(),
            source,
        })?;

    if !config.use_cache {
        return run(&zoro, &toolchain, config, progress_callback);
    }

    match cache::CacheStorage::open("metadata", Some(METADATA_CACHE_TTL)) {
        Ok(cache) => {
            let provider = CachedMetadataProvider::new(zoro, cache);
            run(&provider, &toolchain, config, progress_callback)
        }
        Err(e) => {
            tracing::warn!(error = %e, "metadata cache unavailable, continuing without it");
            run(&zoro, &toolchain, config, progress_callback)
        }
    }
}

/// Runs the episode loop against the given collaborators
pub(crate) fn run<P, T, F>(
    provider: &P,
    toolchain: &T,
    config: &DownloadConfig,
    mut progress_callback: F,
) -> Result<Vec<EpisodeOutput>, ZoroDlError>
where
    P: MetadataProvider + ?Sized,
    T: MediaToolchain + ?Sized,
    F: FnMut(ProgressEvent),
{
    config.validate()?;

    let show_id =
        ShowIdentifier::from_url(&config.source_url).map_err(ZoroDlError::InvalidSource)?;

    progress_callback(ProgressEvent::Started {
        source_url: config.source_url.clone(),
        show_id: show_id.to_string(),
    });

    progress_callback(ProgressEvent::FetchingMetadata {
        show_id: show_id.to_string(),
    });

    let show = resolve_show(provider, &show_id).map_err(|source| {
        ZoroDlError::MetadataUnavailable {
            show: show_id.to_string(),
            source,
        }
    })?;

    progress_callback(ProgressEvent::MetadataResolved {
        title: show.title.clone(),
        episode_count: show.episodes.len(),
    });

    let selected = config.episodes.resolve(show.episodes.len())?;

    progress_callback(ProgressEvent::EpisodesSelected {
        episodes: selected.clone(),
    });

    if !selected.is_empty() {
        fs::create_dir_all(&config.output_dir)?;
        fs::create_dir_all(&config.work_dir)?;
    }

    let mut outputs = Vec::new();

    // Episodes are processed strictly one after another
    for (index, &number) in selected.iter().enumerate() {
        let episode = show
            .episode(number)
            .ok_or(EpisodeRangeError::EpisodeOutOfRange {
                episode: number,
                available: show.episodes.len(),
            })?;

        progress_callback(ProgressEvent::ProcessingEpisode {
            index,
            total: selected.len(),
            episode: number,
            title: episode.title.clone(),
        });

        let started = Instant::now();
        let output = process_episode(
            provider,
            toolchain,
            config,
            &show,
            episode,
            &mut progress_callback,
        )
        .map_err(|source| {
            tracing::error!(episode = number, error = %source, "episode failed");
            ZoroDlError::Episode {
                episode: number,
                source,
            }
        })?;

        progress_callback(ProgressEvent::EpisodeComplete {
            episode: number,
            elapsed: started.elapsed(),
        });

        outputs.push(output);
    }

    progress_callback(ProgressEvent::Complete {
        processed: outputs.len(),
    });

    Ok(outputs)
}

/// Processes one episode under a fresh run token
///
/// Temporary files are removed only after a successful mux.
fn process_episode<P, T, F>(
    provider: &P,
    toolchain: &T,
    config: &DownloadConfig,
    show: &Show,
    episode: &EpisodeRecord,
    progress_callback: &mut F,
) -> Result<EpisodeOutput, EpisodeError>
where
    P: MetadataProvider + ?Sized,
    T: MediaToolchain + ?Sized,
    F: FnMut(ProgressEvent),
{
    let mut files = RunFiles::new(RunToken::new());

    let span = tracing::info_span!("episode", number = episode.number, token = %files.token());
    let _entered = span.enter();

    let outcome = download_and_mux(
        provider,
        toolchain,
        config,
        show,
        episode,
        &mut files,
        progress_callback,
    );

    match outcome {
        Ok(output) => {
            match files.cleanup() {
                Ok(removed) => progress_callback(ProgressEvent::CleanedUp {
                    episode: episode.number,
                    removed: removed.len(),
                }),
                Err(e) => tracing::warn!(error = %e, "failed to remove temporary files"),
            }
            Ok(output)
        }
        Err(e) => {
            if !files.paths().is_empty() {
                tracing::warn!(files = ?files.paths(), "leaving temporary files of failed episode");
            }
            Err(e)
        }
    }
}

fn download_and_mux<P, T, F>(
    provider: &P,
    toolchain: &T,
    config: &DownloadConfig,
    show: &Show,
    episode: &EpisodeRecord,
    files: &mut RunFiles,
    progress_callback: &mut F,
) -> Result<EpisodeOutput, EpisodeError>
where
    P: MetadataProvider + ?Sized,
    T: MediaToolchain + ?Sized,
    F: FnMut(ProgressEvent),
{
    let token = files.token();

    let handles = select_streams(episode, config.mode)?;
    progress_callback(ProgressEvent::StreamsSelected {
        episode: episode.number,
        modes: handles.iter().map(|h| h.mode).collect(),
    });

    let descriptor = fetch_sources(provider, show, episode, config.season, &handles, config.mode)?;
    progress_callback(ProgressEvent::SourcesFetched {
        episode: episode.number,
        video_count: descriptor.video_sources.len(),
        subtitle_count: descriptor.subtitle_sources.len(),
    });

    let downloads =
        build_download_invocations(&descriptor, token, config.resolution, &config.work_dir);
    for invocation in &downloads {
        progress_callback(ProgressEvent::DownloadingVideo {
            episode: episode.number,
            mode: invocation.mode,
        });
        files.track(&invocation.output_path);
        toolchain
            .download_video(invocation)
            .map_err(EpisodeError::Download)?;
    }

    let mut subtitles: Vec<SubtitleDownload> = Vec::new();
    for download in build_subtitle_downloads(&descriptor, token, &config.work_dir) {
        progress_callback(ProgressEvent::DownloadingSubtitle {
            episode: episode.number,
            language: download.source.label.clone(),
        });
        files.track(&download.path);

        // Subtitles are best effort; a missing track never blocks the mux
        let outcome = toolchain.download_subtitle(&download).and_then(|()| {
            if download.path.exists() {
                Ok(())
            } else {
                Err(ToolchainError::FileNotFound(download.path.clone()))
            }
        });
        match outcome {
            Ok(()) => subtitles.push(download),
            Err(e) => {
                tracing::warn!(language = %download.source.label, error = %e, "skipping subtitle");
                progress_callback(ProgressEvent::SubtitleSkipped {
                    episode: episode.number,
                    language: download.source.label.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    let video_inputs = downloads
        .iter()
        .map(|invocation| verify_video(&invocation.output_path))
        .collect::<Result<Vec<_>, _>>()
        .map_err(EpisodeError::Download)?;

    // Name and tag the file after the subtitles that actually made it
    let descriptor = SourceDescriptor {
        subtitle_sources: subtitles.iter().map(|s| s.source.clone()).collect(),
        ..descriptor
    };

    let mux = build_mux_invocation(&descriptor, config.mode, &video_inputs, &subtitles, config)?;

    progress_callback(ProgressEvent::Muxing {
        episode: episode.number,
        output_path: mux.output_path.clone(),
    });
    toolchain.mux(&mux).map_err(EpisodeError::Mux)?;

    tracing::info!(output = %mux.output_path.display(), "episode muxed");
    progress_callback(ProgressEvent::Muxed {
        episode: episode.number,
        output_path: mux.output_path.clone(),
    });

    Ok(EpisodeOutput {
        episode: episode.number,
        output_path: mux.output_path,
    })
}

/// Checks that a downloaded video exists and looks like a video
fn verify_video(path: &Path) -> Result<PathBuf, ToolchainError> {
    if !path.is_file() {
        return Err(ToolchainError::FileNotFound(path.to_path_buf()));
    }

    if !is_video_file(path) {
        return Err(ToolchainError::InvalidMedia(path.to_path_buf()));
    }

    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{DownloadInvocation, MuxInvocation};
    use crate::fetch::tests::{ScriptedProvider, sample_show, watch};
    use crate::temp::tests::MP4_HEADER;
    use std::cell::RefCell;

    /// Toolchain writing fake media files and recording every call
    #[derive(Default)]
    struct RecordingToolchain {
        videos: RefCell<Vec<DownloadInvocation>>,
        subtitles: RefCell<Vec<SubtitleDownload>>,
        muxes: RefCell<Vec<MuxInvocation>>,
        /// Subtitle language codes whose download fails
        failing_subtitles: Vec<&'static str>,
        fail_mux: bool,
    }

    impl RecordingToolchain {
        fn call_count(&self) -> usize {
            self.videos.borrow().len() + self.subtitles.borrow().len() + self.muxes.borrow().len()
        }
    }

    impl MediaToolchain for RecordingToolchain {
        fn download_video(&self, invocation: &DownloadInvocation) -> Result<(), ToolchainError> {
            fs::write(&invocation.output_path, MP4_HEADER)?;
            self.videos.borrow_mut().push(invocation.clone());
            Ok(())
        }

        fn download_subtitle(&self, download: &SubtitleDownload) -> Result<(), ToolchainError> {
            self.subtitles.borrow_mut().push(download.clone());
            if self.failing_subtitles.contains(&download.source.code.as_str()) {
                return Err(ToolchainError::SubtitleDownloadFailed {
                    url: download.source.url.clone(),
                    reason: "HTTP 404".to_string(),
                });
            }
            fs::write(&download.path, "WEBVTT\n")?;
            Ok(())
        }

        fn mux(&self, invocation: &MuxInvocation) -> Result<(), ToolchainError> {
            self.muxes.borrow_mut().push(invocation.clone());
            if self.fail_mux {
                return Err(ToolchainError::ExternalToolFailure {
                    tool: "ffmpeg".to_string(),
                    status: "exit status: 1".to_string(),
                    details: String::new(),
                });
            }
            fs::write(&invocation.output_path, MP4_HEADER)?;
            Ok(())
        }
    }

    struct Dirs {
        _root: tempfile::TempDir,
        output: PathBuf,
        work: PathBuf,
    }

    fn dirs() -> Dirs {
        let root = tempfile::tempdir().unwrap();
        let output = root.path().join("out");
        let work = root.path().join("work");
        Dirs {
            output,
            work,
            _root: root,
        }
    }

    fn config(dirs: &Dirs, episodes: &str, mode: DownloadMode) -> DownloadConfig {
        DownloadConfig {
            source_url: "https://hianime.to/watch/sample-show-100?ep=1001".to_string(),
            episodes: EpisodeSelection::parse(Some(episodes)).unwrap(),
            mode,
            output_dir: dirs.output.clone(),
            work_dir: dirs.work.clone(),
            ..DownloadConfig::default()
        }
    }

    fn dual_audio_provider(episodes: usize) -> ScriptedProvider {
        let mut provider = ScriptedProvider::new(Some(sample_show(episodes, Availability::Both)));
        for n in 1..=episodes {
            let id = 1000 + n;
            provider = provider
                .with_watch(
                    &format!("sample-show-100$episode${}$sub", id),
                    watch(
                        &format!("https://cdn/{}/sub.m3u8", id),
                        &[
                            ("English", "https://cdn/eng.vtt"),
                            ("Thumbnails", "https://cdn/thumbnails.vtt"),
                            ("Spanish", "https://cdn/spa.vtt"),
                        ],
                    ),
                )
                .with_watch(
                    &format!("sample-show-100$episode${}$dub", id),
                    watch(&format!("https://cdn/{}/dub.m3u8", id), &[]),
                );
        }
        provider
    }

    fn dir_entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .map(|entries| {
                entries
                    .flatten()
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }

    #[test]
    fn test_single_episode_dual_audio_end_to_end() {
        let dirs = dirs();
        let provider = dual_audio_provider(12);
        let toolchain = RecordingToolchain::default();
        let mut events = Vec::new();

        let outputs = run(
            &provider,
            &toolchain,
            &config(&dirs, "5", DownloadMode::Both),
            |event| events.push(event),
        )
        .unwrap();

        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].episode, 5);

        let videos = toolchain.videos.borrow();
        assert_eq!(videos.len(), 2);
        assert_eq!(videos[0].mode, AudioMode::Sub);
        assert_eq!(videos[0].url, "https://cdn/1005/sub.m3u8");
        assert_eq!(videos[1].mode, AudioMode::Dub);
        assert_eq!(toolchain.subtitles.borrow().len(), 2);
        assert_eq!(toolchain.muxes.borrow().len(), 1);

        let name = "[NOGRP] Sample Show - S01E05 - Episode Title 5 [JPN-ENG] [MULTI-SUBS].mp4";
        assert_eq!(outputs[0].output_path, dirs.output.join(name));
        assert_eq!(dir_entries(&dirs.output), vec![name.to_string()]);

        // Every temporary file of the run is gone
        assert!(dir_entries(&dirs.work).is_empty());
        assert!(events.iter().any(|e| matches!(
            e,
            ProgressEvent::CleanedUp {
                episode: 5,
                removed: 4
            }
        )));
        assert!(matches!(
            events.last(),
            Some(ProgressEvent::Complete { processed: 1 })
        ));
    }

    #[test]
    fn test_metadata_failure_invokes_no_tools() {
        let dirs = dirs();
        let provider = ScriptedProvider::new(None);
        let toolchain = RecordingToolchain::default();

        let result = run(
            &provider,
            &toolchain,
            &config(&dirs, "5", DownloadMode::Both),
            |_| {},
        );

        assert!(matches!(
            result,
            Err(ZoroDlError::MetadataUnavailable { .. })
        ));
        assert_eq!(toolchain.call_count(), 0);
        assert!(!dirs.output.exists());
    }

    #[test]
    fn test_empty_episode_list_is_metadata_unavailable() {
        let dirs = dirs();
        let provider = ScriptedProvider::new(Some(sample_show(0, Availability::Both)));
        let toolchain = RecordingToolchain::default();

        let result = run(&provider, &toolchain, &config(&dirs, "", DownloadMode::Sub), |_| {});

        assert!(matches!(
            result,
            Err(ZoroDlError::MetadataUnavailable {
                source: MetadataRetrievalError::NoEpisodes(_),
                ..
            })
        ));
    }

    #[test]
    fn test_range_uses_fresh_token_per_episode() {
        let dirs = dirs();
        let provider = dual_audio_provider(4);
        let toolchain = RecordingToolchain::default();

        let outputs = run(
            &provider,
            &toolchain,
            &config(&dirs, "2-3", DownloadMode::Sub),
            |_| {},
        )
        .unwrap();

        let processed: Vec<_> = outputs.iter().map(|o| o.episode).collect();
        assert_eq!(processed, vec![2, 3]);

        let videos = toolchain.videos.borrow();
        assert_eq!(videos.len(), 2);
        assert!(videos.iter().all(|v| v.mode == AudioMode::Sub));
        assert_ne!(videos[0].basename, videos[1].basename);
        assert!(videos[0].basename.starts_with("4242_sub_"));
    }

    #[test]
    fn test_dub_only_fetches_no_subtitles() {
        let dirs = dirs();
        let provider = dual_audio_provider(1);
        let toolchain = RecordingToolchain::default();

        let outputs = run(
            &provider,
            &toolchain,
            &config(&dirs, "1", DownloadMode::Dub),
            |_| {},
        )
        .unwrap();

        assert_eq!(toolchain.videos.borrow().len(), 1);
        assert!(toolchain.subtitles.borrow().is_empty());
        assert_eq!(
            provider.requested(),
            vec!["sample-show-100$episode$1001$dub".to_string()]
        );
        assert!(outputs[0]
            .output_path
            .to_string_lossy()
            .ends_with("[ENG] [NO-SUBS].mp4"));
    }

    #[test]
    fn test_reversed_range_processes_nothing() {
        let dirs = dirs();
        let provider = dual_audio_provider(12);
        let toolchain = RecordingToolchain::default();

        let outputs = run(
            &provider,
            &toolchain,
            &config(&dirs, "7-3", DownloadMode::Both),
            |_| {},
        )
        .unwrap();

        assert!(outputs.is_empty());
        assert_eq!(toolchain.call_count(), 0);
    }

    #[test]
    fn test_out_of_range_episode() {
        let dirs = dirs();
        let provider = dual_audio_provider(3);
        let toolchain = RecordingToolchain::default();

        let result = run(
            &provider,
            &toolchain,
            &config(&dirs, "4", DownloadMode::Both),
            |_| {},
        );

        assert!(matches!(
            result,
            Err(ZoroDlError::EpisodeRange(EpisodeRangeError::EpisodeOutOfRange {
                episode: 4,
                available: 3
            }))
        ));
        assert_eq!(toolchain.call_count(), 0);
    }

    #[test]
    fn test_both_on_sub_only_episode_fails_before_downloading() {
        let dirs = dirs();
        let provider = ScriptedProvider::new(Some(sample_show(2, Availability::Sub)));
        let toolchain = RecordingToolchain::default();

        let result = run(
            &provider,
            &toolchain,
            &config(&dirs, "1", DownloadMode::Both),
            |_| {},
        );

        assert!(matches!(
            result,
            Err(ZoroDlError::Episode {
                episode: 1,
                source: EpisodeError::StreamSelection(
                    StreamSelectionError::UnavailableForMode { .. }
                )
            })
        ));
        assert_eq!(toolchain.call_count(), 0);
    }

    #[test]
    fn test_failed_subtitle_is_left_out() {
        let dirs = dirs();
        let provider = dual_audio_provider(1);
        let toolchain = RecordingToolchain {
            failing_subtitles: vec!["spa"],
            ..RecordingToolchain::default()
        };
        let mut skipped = Vec::new();

        let outputs = run(
            &provider,
            &toolchain,
            &config(&dirs, "1", DownloadMode::Sub),
            |event| {
                if let ProgressEvent::SubtitleSkipped { language, .. } = event {
                    skipped.push(language);
                }
            },
        )
        .unwrap();

        assert_eq!(skipped, vec!["Spanish".to_string()]);
        let mux = &toolchain.muxes.borrow()[0];
        let args = mux.args.join(" ");
        assert!(args.contains("language=eng"));
        assert!(!args.contains("language=spa"));
        assert!(outputs[0]
            .output_path
            .to_string_lossy()
            .ends_with("[JPN] [ENG-SUBS].mp4"));
    }

    #[test]
    fn test_failed_mux_keeps_temporary_files() {
        let dirs = dirs();
        let provider = dual_audio_provider(1);
        let toolchain = RecordingToolchain {
            fail_mux: true,
            ..RecordingToolchain::default()
        };

        let result = run(
            &provider,
            &toolchain,
            &config(&dirs, "1", DownloadMode::Both),
            |_| {},
        );

        assert!(matches!(
            result,
            Err(ZoroDlError::Episode {
                source: EpisodeError::Mux(_),
                ..
            })
        ));
        assert_eq!(dir_entries(&dirs.work).len(), 4);
        assert!(dir_entries(&dirs.output).is_empty());
    }

    #[test]
    fn test_verify_video() {
        let dirs = dirs();
        fs::create_dir_all(&dirs.work).unwrap();
        let video = dirs.work.join("ok.mp4");
        let bogus = dirs.work.join("bogus.mp4");
        fs::write(&video, MP4_HEADER).unwrap();
        fs::write(&bogus, "<html>403</html>").unwrap();

        assert_eq!(verify_video(&video).unwrap(), video);
        assert!(matches!(verify_video(&bogus), Err(ToolchainError::InvalidMedia(_))));
        assert!(matches!(
            verify_video(&dirs.work.join("missing.mp4")),
            Err(ToolchainError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let dirs = dirs();
        let provider = dual_audio_provider(1);
        let toolchain = RecordingToolchain::default();
        let config = DownloadConfig {
            season: 0,
            ..config(&dirs, "1", DownloadMode::Both)
        };

        assert!(matches!(
            run(&provider, &toolchain, &config, |_| {}),
            Err(ZoroDlError::Config(ConfigError::InvalidSeason(_)))
        ));
    }
}
