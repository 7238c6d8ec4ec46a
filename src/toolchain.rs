//! External toolchain module
//!
//! Executes the invocations built by the command builder: the HLS
//! downloader as a child process, subtitle tracks over HTTP and the mux
//! through ffmpeg.

use crate::commands::{DownloadInvocation, MuxInvocation, SubtitleDownload};
use ffmpeg_sidecar::command::FfmpegCommand;
use ffmpeg_sidecar::event::{FfmpegEvent, LogLevel};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while running the external tools
#[derive(Debug, Error)]
pub enum ToolchainError {
    /// A required binary could not be started
    #[error("{0} not found. Please install it or pass its path explicitly.")]
    ToolNotFound(String),

    /// A tool ran but exited unsuccessfully
    #[error("{tool} failed with {status}{details}")]
    ExternalToolFailure {
        tool: String,
        status: String,
        /// Collected error output, prefixed with a separator when non-empty
        details: String,
    },

    /// A subtitle track could not be fetched
    #[error("Failed to download subtitle from {url}: {reason}")]
    SubtitleDownloadFailed { url: String, reason: String },

    /// A file expected before muxing is missing
    #[error("Expected file not found: {0}")]
    FileNotFound(PathBuf),

    /// A downloaded file is not a video
    #[error("Downloaded file is not a recognizable video: {0}")]
    InvalidMedia(PathBuf),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// The external collaborators needed to turn sources into a file
///
/// Implementations block until the respective step has finished.
pub(crate) trait MediaToolchain {
    /// Downloads one video variant to `invocation.output_path`
    fn download_video(&self, invocation: &DownloadInvocation) -> Result<(), ToolchainError>;

    /// Downloads one subtitle track to `download.path`
    fn download_subtitle(&self, download: &SubtitleDownload) -> Result<(), ToolchainError>;

    /// Muxes the inputs into `invocation.output_path`
    fn mux(&self, invocation: &MuxInvocation) -> Result<(), ToolchainError>;
}

/// Toolchain backed by `N_m3u8DL-RE`, reqwest and ffmpeg
pub(crate) struct ExternalToolchain {
    downloader: PathBuf,
    ffmpeg: Option<PathBuf>,
    client: reqwest::blocking::Client,
}

impl ExternalToolchain {
    pub fn new(
        downloader: PathBuf,
        ffmpeg: Option<PathBuf>,
        timeout: Duration,
    ) -> Result<Self, ToolchainError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ToolchainError::Io(io::Error::other(e)))?;

        Ok(Self {
            downloader,
            ffmpeg,
            client,
        })
    }

    /// Checks that both external binaries can be started
    pub fn ensure_available(&self) -> Result<(), ToolchainError> {
        if !Self::responds(&self.downloader, "--version") {
            return Err(ToolchainError::ToolNotFound(
                self.downloader.display().to_string(),
            ));
        }

        let ffmpeg_found = match &self.ffmpeg {
            Some(path) => Self::responds(path, "-version"),
            None => ffmpeg_sidecar::command::ffmpeg_is_installed(),
        };
        if !ffmpeg_found {
            return Err(ToolchainError::ToolNotFound("ffmpeg".to_string()));
        }

        Ok(())
    }

    /// Runs `binary flag` silently and reports whether it succeeded
    fn responds(binary: &Path, flag: &str) -> bool {
        Command::new(binary)
            .arg(flag)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }

    fn ffmpeg_command(&self) -> FfmpegCommand {
        match &self.ffmpeg {
            Some(path) => FfmpegCommand::new_with_path(path),
            None => FfmpegCommand::new(),
        }
    }
}

impl MediaToolchain for ExternalToolchain {
    fn download_video(&self, invocation: &DownloadInvocation) -> Result<(), ToolchainError> {
        tracing::debug!(
            tool = %self.downloader.display(),
            args = ?invocation.args,
            "starting downloader"
        );

        // Output is inherited so the downloader's own progress bar stays visible
        let status = Command::new(&self.downloader)
            .args(&invocation.args)
            .status()
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => {
                    ToolchainError::ToolNotFound(self.downloader.display().to_string())
                }
                _ => ToolchainError::Io(e),
            })?;

        if !status.success() {
            return Err(ToolchainError::ExternalToolFailure {
                tool: self.downloader.display().to_string(),
                status: status.to_string(),
                details: String::new(),
            });
        }

        Ok(())
    }

    fn download_subtitle(&self, download: &SubtitleDownload) -> Result<(), ToolchainError> {
        let url = &download.source.url;
        let failed = |reason: String| ToolchainError::SubtitleDownloadFailed {
            url: url.clone(),
            reason,
        };

        let mut response = self
            .client
            .get(url)
            .send()
            .map_err(|e| failed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(failed(format!("HTTP {}", response.status())));
        }

        let mut file = File::create(&download.path)?;
        response
            .copy_to(&mut file)
            .map_err(|e| failed(e.to_string()))?;

        Ok(())
    }

    fn mux(&self, invocation: &MuxInvocation) -> Result<(), ToolchainError> {
        tracing::debug!(args = ?invocation.args, "starting ffmpeg");

        let mut child = self
            .ffmpeg_command()
            .args(&invocation.args)
            .spawn()
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => ToolchainError::ToolNotFound("ffmpeg".to_string()),
                _ => ToolchainError::Io(e),
            })?;

        let mut error_lines = Vec::new();
        let events = child
            .iter()
            .map_err(|e| ToolchainError::Io(io::Error::other(e.to_string())))?;

        for event in events {
            match event {
                FfmpegEvent::Log(LogLevel::Error | LogLevel::Fatal, line) => error_lines.push(line),
                FfmpegEvent::Error(line) => error_lines.push(line),
                FfmpegEvent::Progress(progress) => {
                    tracing::trace!(time = %progress.time, "mux progress");
                }
                _ => {}
            }
        }

        let status = child.wait()?;
        if !status.success() {
            let details = if error_lines.is_empty() {
                String::new()
            } else {
                format!(":\n{}", error_lines.join("\n"))
            };

            return Err(ToolchainError::ExternalToolFailure {
                tool: "ffmpeg".to_string(),
                status: status.to_string(),
                details,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_downloader_is_reported() {
        let toolchain = ExternalToolchain::new(
            PathBuf::from("/nonexistent/N_m3u8DL-RE"),
            None,
            Duration::from_secs(5),
        )
        .unwrap();

        assert!(matches!(
            toolchain.ensure_available(),
            Err(ToolchainError::ToolNotFound(_))
        ));
    }

    #[test]
    fn test_download_video_with_missing_binary() {
        let toolchain = ExternalToolchain::new(
            PathBuf::from("/nonexistent/N_m3u8DL-RE"),
            None,
            Duration::from_secs(5),
        )
        .unwrap();
        let invocation = DownloadInvocation {
            mode: crate::stream_selection::AudioMode::Sub,
            url: "https://cdn/master.m3u8".to_string(),
            basename: "1_sub_token".to_string(),
            output_path: PathBuf::from("1_sub_token.mp4"),
            args: vec!["https://cdn/master.m3u8".to_string()],
        };

        assert!(matches!(
            toolchain.download_video(&invocation),
            Err(ToolchainError::ToolNotFound(_))
        ));
    }

    #[test]
    fn test_failure_message_includes_details() {
        let error = ToolchainError::ExternalToolFailure {
            tool: "ffmpeg".to_string(),
            status: "exit status: 1".to_string(),
            details: ":\nInvalid data found".to_string(),
        };

        assert_eq!(
            error.to_string(),
            "ffmpeg failed with exit status: 1:\nInvalid data found"
        );
    }
}
