//! Download configuration
//!
//! The settings of one invocation: what to download, how to name it and
//! where the external tools and the metadata API live.

use crate::episode_range::EpisodeSelection;
use crate::stream_selection::DownloadMode;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Default Consumet-compatible metadata API instance
pub const DEFAULT_API_URL: &str = "https://api.consumet.org";

/// Default name of the HLS downloader binary
pub const DEFAULT_DOWNLOADER: &str = "N_m3u8DL-RE";

/// Errors that can occur while validating the configuration
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Resolution is not a positive pixel height like `1080` or `1080p`
    #[error("Invalid resolution '{0}': expected a height like 1080 or 1080p")]
    InvalidResolution(String),

    /// Season numbers start at 1
    #[error("Invalid season '{0}': expected a positive number")]
    InvalidSeason(String),

    /// The group tag ends up in file names and must be usable there
    #[error("Invalid group tag '{0}'")]
    InvalidGroupTag(String),
}

/// Output container of the muxed file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Container {
    /// MP4 with `mov_text` subtitles
    #[default]
    Mp4,
    /// Matroska with SubRip subtitles
    Mkv,
}

impl Container {
    pub fn extension(&self) -> &'static str {
        match self {
            Container::Mp4 => "mp4",
            Container::Mkv => "mkv",
        }
    }

    /// Text subtitle codec supported by the container
    pub fn subtitle_codec(&self) -> &'static str {
        match self {
            Container::Mp4 => "mov_text",
            Container::Mkv => "srt",
        }
    }
}

/// Target vertical resolution, e.g. 1080
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution(pub u32);

impl Default for Resolution {
    fn default() -> Self {
        Resolution(1080)
    }
}

impl FromStr for Resolution {
    type Err = ConfigError;

    /// Accepts `1080` as well as `1080p`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_suffix('p')
            .or_else(|| trimmed.strip_suffix('P'))
            .unwrap_or(trimmed);

        match digits.parse::<u32>() {
            Ok(height) if height > 0 => Ok(Resolution(height)),
            _ => Err(ConfigError::InvalidResolution(s.to_string())),
        }
    }
}

/// Parses a season label such as `"1"` or `"02"`
pub fn parse_season(label: &str) -> Result<u32, ConfigError> {
    match label.trim().parse::<u32>() {
        Ok(season) if season > 0 => Ok(season),
        _ => Err(ConfigError::InvalidSeason(label.to_string())),
    }
}

/// Settings for downloading episodes of one show
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    /// Watch or detail page URL of the show (or its bare id)
    pub source_url: String,
    /// Season number used in the output file name
    pub season: u32,
    /// Which episodes to download
    pub episodes: EpisodeSelection,
    pub resolution: Resolution,
    pub mode: DownloadMode,
    /// Release group tag stamped into the file name and metadata
    pub group_tag: String,
    /// Directory receiving the muxed files
    pub output_dir: PathBuf,
    /// Directory receiving the temporary per-run downloads
    pub work_dir: PathBuf,
    pub container: Container,
    /// Base URL of the metadata API
    pub api_url: String,
    /// Preferred streaming server (e.g. `vidstreaming`), API default if unset
    pub server: Option<String>,
    /// Path or name of the HLS downloader binary
    pub downloader_path: PathBuf,
    /// Explicit ffmpeg binary; looked up by ffmpeg-sidecar if unset
    pub ffmpeg_path: Option<PathBuf>,
    /// Timeout for metadata and subtitle requests
    pub http_timeout: Duration,
    /// Whether resolved show metadata may be cached on disk
    pub use_cache: bool,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            source_url: String::new(),
            season: 1,
            episodes: EpisodeSelection::All,
            resolution: Resolution::default(),
            mode: DownloadMode::Both,
            group_tag: "NOGRP".to_string(),
            output_dir: PathBuf::from("."),
            work_dir: PathBuf::from("."),
            container: Container::Mp4,
            api_url: DEFAULT_API_URL.to_string(),
            server: None,
            downloader_path: PathBuf::from(DEFAULT_DOWNLOADER),
            ffmpeg_path: None,
            http_timeout: Duration::from_secs(30),
            use_cache: true,
        }
    }
}

impl DownloadConfig {
    /// Checks the values that end up in file names and tool arguments
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.season == 0 {
            return Err(ConfigError::InvalidSeason(self.season.to_string()));
        }

        if self.resolution.0 == 0 {
            return Err(ConfigError::InvalidResolution(self.resolution.0.to_string()));
        }

        let tag = self.group_tag.trim();
        if tag.is_empty()
            || tag
                .chars()
                .any(|c| matches!(c, '/' | '\\' | '[' | ']') || c.is_control())
        {
            return Err(ConfigError::InvalidGroupTag(self.group_tag.clone()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_resolution() {
        assert_eq!("1080p".parse::<Resolution>(), Ok(Resolution(1080)));
        assert_eq!("720".parse::<Resolution>(), Ok(Resolution(720)));
        assert_eq!(" 480P ".parse::<Resolution>(), Ok(Resolution(480)));
        assert!("hd".parse::<Resolution>().is_err());
        assert!("0p".parse::<Resolution>().is_err());
    }

    #[test]
    fn test_parse_season() {
        assert_eq!(parse_season("1"), Ok(1));
        assert_eq!(parse_season("02"), Ok(2));
        assert!(parse_season("0").is_err());
        assert!(parse_season("S1").is_err());
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = DownloadConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.group_tag, "NOGRP");
        assert_eq!(config.mode, DownloadMode::Both);
    }

    #[test]
    fn test_group_tag_validation() {
        let config = DownloadConfig {
            group_tag: "BAD/TAG".to_string(),
            ..DownloadConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidGroupTag(_))));

        let empty = DownloadConfig {
            group_tag: "  ".to_string(),
            ..DownloadConfig::default()
        };
        assert!(empty.validate().is_err());
    }

    #[test]
    fn test_container_codecs() {
        assert_eq!(Container::Mp4.subtitle_codec(), "mov_text");
        assert_eq!(Container::Mkv.subtitle_codec(), "srt");
        assert_eq!(Container::Mkv.extension(), "mkv");
    }
}
