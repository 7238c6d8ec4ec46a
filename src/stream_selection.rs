//! Stream selection module
//!
//! Decides which audio variants of an episode are fetched for a requested
//! download mode and builds the stream handles used to request them.

use crate::metadata_retrieval::{Availability, EpisodeRecord};
use std::fmt;
use thiserror::Error;

/// Errors that can occur while selecting streams
#[derive(Debug, Error)]
pub enum StreamSelectionError {
    /// The episode is not published in the variants the mode asks for
    #[error("Episode {episode} is only available as {availability}, but {requested} was requested")]
    UnavailableForMode {
        episode: usize,
        availability: Availability,
        requested: DownloadMode,
    },
}

/// A single audio variant of an episode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioMode {
    /// Original Japanese audio
    Sub,
    /// English dub
    Dub,
}

impl AudioMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioMode::Sub => "sub",
            AudioMode::Dub => "dub",
        }
    }
}

impl fmt::Display for AudioMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the user asked to download
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DownloadMode {
    Sub,
    Dub,
    /// Both audio variants, muxed as dual audio
    #[default]
    Both,
}

impl DownloadMode {
    /// Whether subtitle tracks are fetched for this mode
    ///
    /// Dub-only downloads never carry subtitles.
    pub fn wants_subtitles(&self) -> bool {
        matches!(self, DownloadMode::Sub | DownloadMode::Both)
    }
}

impl fmt::Display for DownloadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DownloadMode::Sub => "sub",
            DownloadMode::Dub => "dub",
            DownloadMode::Both => "both",
        };
        f.write_str(label)
    }
}

/// Composite key identifying one audio variant of one episode
///
/// Rendered as `{watch_id}$episode${episode_id}${mode}`, the form the watch
/// endpoint expects.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StreamHandle {
    pub watch_id: String,
    pub episode_id: String,
    pub mode: AudioMode,
}

impl StreamHandle {
    pub fn new(episode: &EpisodeRecord, mode: AudioMode) -> Self {
        Self {
            watch_id: episode.watch_id.clone(),
            episode_id: episode.episode_id.clone(),
            mode,
        }
    }

    /// The same episode with the original audio; subtitles are only published there
    pub fn sub_variant(&self) -> Self {
        Self {
            mode: AudioMode::Sub,
            ..self.clone()
        }
    }
}

impl fmt::Display for StreamHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}$episode${}${}", self.watch_id, self.episode_id, self.mode)
    }
}

/// Selects the stream handles to fetch for an episode
///
/// `Both` yields the sub handle followed by the dub handle, and only for
/// episodes available in both variants. Single modes always yield exactly one
/// handle and leave availability checks to the API.
pub fn select_streams(
    episode: &EpisodeRecord,
    requested: DownloadMode,
) -> Result<Vec<StreamHandle>, StreamSelectionError> {
    match (requested, episode.availability) {
        (DownloadMode::Both, Availability::Both) => Ok(vec![
            StreamHandle::new(episode, AudioMode::Sub),
            StreamHandle::new(episode, AudioMode::Dub),
        ]),
        (DownloadMode::Both, availability) => Err(StreamSelectionError::UnavailableForMode {
            episode: episode.number,
            availability,
            requested,
        }),
        (DownloadMode::Dub, _) => Ok(vec![StreamHandle::new(episode, AudioMode::Dub)]),
        (DownloadMode::Sub, _) => Ok(vec![StreamHandle::new(episode, AudioMode::Sub)]),
    }
}
