//! Command building module
//!
//! Translates a [`SourceDescriptor`] into the invocations of the external
//! downloader, the subtitle downloads and the ffmpeg mux command, and names
//! the resulting file.

use crate::config::{Container, DownloadConfig, Resolution};
use crate::fetch::{SourceDescriptor, SubtitleSource};
use crate::stream_selection::{AudioMode, DownloadMode};
use crate::temp::RunToken;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while building commands
#[derive(Debug, Error)]
pub enum CommandBuildError {
    /// There is nothing to mux
    #[error("Episode {0} has no video source to mux")]
    NoVideoSources(usize),
}

/// One run of the HLS downloader
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadInvocation {
    pub mode: AudioMode,
    pub url: String,
    /// File name without extension, `{numericId}_{mode}_{token}`
    pub basename: String,
    /// Where the downloader leaves the finished file
    pub output_path: PathBuf,
    pub args: Vec<String>,
}

/// One subtitle file to fetch over HTTP
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleDownload {
    pub source: SubtitleSource,
    pub path: PathBuf,
}

/// The ffmpeg invocation muxing everything into the final file
#[derive(Debug, Clone, PartialEq)]
pub struct MuxInvocation {
    pub args: Vec<String>,
    pub output_path: PathBuf,
}

/// Builds one downloader invocation per video source
pub fn build_download_invocations(
    descriptor: &SourceDescriptor,
    token: RunToken,
    resolution: Resolution,
    work_dir: &Path,
) -> Vec<DownloadInvocation> {
    descriptor
        .video_sources
        .iter()
        .map(|source| {
            let basename = format!("{}_{}_{}", descriptor.show_numeric_id, source.mode, token);
            let output_path = work_dir.join(format!("{}.mp4", basename));

            let args = vec![
                source.url.clone(),
                "--save-name".to_string(),
                basename.clone(),
                "--save-dir".to_string(),
                work_dir.display().to_string(),
                "-sv".to_string(),
                format!("res=.*x{}:for=best", resolution.0),
                "-sa".to_string(),
                "for=best".to_string(),
                "-M".to_string(),
                "format=mp4".to_string(),
            ];

            DownloadInvocation {
                mode: source.mode,
                url: source.url.clone(),
                basename,
                output_path,
                args,
            }
        })
        .collect()
}

/// Plans the local path of every subtitle track
///
/// Paths follow `subtitle_{code}_{token}.vtt`. When several tracks share a
/// language code, the later ones get an ordinal (`subtitle_spa_2_{token}.vtt`).
pub fn build_subtitle_downloads(
    descriptor: &SourceDescriptor,
    token: RunToken,
    work_dir: &Path,
) -> Vec<SubtitleDownload> {
    let mut seen: HashMap<&str, usize> = HashMap::new();

    descriptor
        .subtitle_sources
        .iter()
        .map(|source| {
            let count = seen.entry(source.code.as_str()).or_insert(0);
            *count += 1;

            let file_name = if *count == 1 {
                format!("subtitle_{}_{}.vtt", source.code, token)
            } else {
                format!("subtitle_{}_{}_{}.vtt", source.code, count, token)
            };

            SubtitleDownload {
                source: source.clone(),
                path: work_dir.join(file_name),
            }
        })
        .collect()
}

/// Audio languages present in the output, as used in the file name
pub fn language_tag(descriptor: &SourceDescriptor) -> &'static str {
    match descriptor.video_sources.as_slice() {
        [_, _, ..] => "JPN-ENG",
        [single] if single.mode == AudioMode::Dub => "ENG",
        _ => "JPN",
    }
}

/// Subtitle availability, as used in the file name
pub fn subtitles_tag(descriptor: &SourceDescriptor) -> &'static str {
    match descriptor.subtitle_sources.len() {
        0 => "NO-SUBS",
        1 => "ENG-SUBS",
        _ => "MULTI-SUBS",
    }
}

/// Names the muxed file
///
/// `[{group}] {title} - S{season:02}E{episode:02} - {episode title} [{lang}] [{subs}].{ext}`
pub fn output_file_name(
    descriptor: &SourceDescriptor,
    group_tag: &str,
    container: Container,
) -> String {
    format!(
        "[{}] {} - S{:02}E{:02} - {} [{}] [{}].{}",
        group_tag.trim(),
        sanitize_filename(&descriptor.show_title),
        descriptor.season,
        descriptor.episode,
        sanitize_filename(&descriptor.episode_title),
        language_tag(descriptor),
        subtitles_tag(descriptor),
        container.extension()
    )
}

/// Builds the ffmpeg arguments muxing the downloaded files
///
/// `video_inputs` are the downloaded video files in source order and
/// `subtitle_inputs` the subtitle files that were actually downloaded. The
/// descriptor's subtitle list is expected to match `subtitle_inputs`.
pub fn build_mux_invocation(
    descriptor: &SourceDescriptor,
    mode: DownloadMode,
    video_inputs: &[PathBuf],
    subtitle_inputs: &[SubtitleDownload],
    config: &DownloadConfig,
) -> Result<MuxInvocation, CommandBuildError> {
    if video_inputs.is_empty() || descriptor.video_sources.is_empty() {
        return Err(CommandBuildError::NoVideoSources(descriptor.episode));
    }

    let dual_audio = mode == DownloadMode::Both && video_inputs.len() > 1;
    let mut args: Vec<String> = vec!["-y".to_string()];

    for input in video_inputs
        .iter()
        .chain(subtitle_inputs.iter().map(|s| &s.path))
    {
        args.push("-i".to_string());
        args.push(input.display().to_string());
    }

    args.extend(["-map", "0:v:0", "-map", "0:a:0"].map(String::from));
    if dual_audio {
        args.extend(["-map", "1:a:0"].map(String::from));
    }
    for index in 0..subtitle_inputs.len() {
        args.push("-map".to_string());
        args.push(format!("{}:s:0", video_inputs.len() + index));
    }

    let (primary_language, primary_title) = match mode {
        DownloadMode::Sub | DownloadMode::Both => ("jpn", "Japanese Audio"),
        DownloadMode::Dub => ("eng", "English Audio"),
    };
    push_stream_metadata(&mut args, "a:0", primary_language, primary_title);
    if dual_audio {
        push_stream_metadata(&mut args, "a:1", "eng", "English Audio");
    }
    for (index, subtitle) in subtitle_inputs.iter().enumerate() {
        push_stream_metadata(
            &mut args,
            &format!("s:{}", index),
            &subtitle.source.code,
            &subtitle.source.label,
        );
    }

    let group_tag = config.group_tag.trim();
    args.extend([
        "-metadata".to_string(),
        format!("encoded_by={}", group_tag),
        "-metadata".to_string(),
        format!("comment={}", group_tag),
    ]);

    args.extend(["-c:v", "copy", "-c:a", "copy", "-c:s"].map(String::from));
    args.push(config.container.subtitle_codec().to_string());

    let output_path = config
        .output_dir
        .join(output_file_name(descriptor, group_tag, config.container));
    args.push(output_path.display().to_string());

    Ok(MuxInvocation { args, output_path })
}

fn push_stream_metadata(args: &mut Vec<String>, stream: &str, language: &str, title: &str) {
    args.push(format!("-metadata:s:{}", stream));
    args.push(format!("language={}", language));
    args.push(format!("-metadata:s:{}", stream));
    args.push(format!("title={}", title));
}

/// Sanitizes a string for use in filenames by replacing problematic characters
///
/// Replaces characters that are invalid or problematic in filenames across platforms:
/// - Path separators: / \
/// - Reserved characters: : * ? " < > |
/// - Control characters
/// - Trim leading/trailing whitespace and dots
pub fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '-',
            c if c.is_control() => '-',
            c => c,
        })
        .collect();

    sanitized
        .trim_matches(|c: char| c.is_whitespace() || c == '.')
        .to_string()
}
