use clap::{Parser, ValueEnum};
use dialoguer::Confirm;
use humansize::{DECIMAL, format_size};
use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::process;
use std::time::Duration;
use zoro_dl::{
    Container, DEFAULT_API_URL, DEFAULT_DOWNLOADER, DownloadConfig, DownloadMode,
    EpisodeSelection, ProgressEvent, Resolution, download_show, init_logging, parse_season,
};

#[derive(Debug, Parser)]
#[command(
    name = "zoro-dl",
    version,
    about = "Download dual-audio, multi-subtitle episodes from Zoro and mux them into one file"
)]
struct Cli {
    /// Watch or detail page URL of the show, or its bare id
    url: String,

    /// Season number used in the output file name
    #[arg(short, long, default_value = "1", value_parser = parse_season)]
    season: u32,

    /// Episode number or inclusive range like 3-7 (whole series if omitted)
    #[arg(short, long)]
    episode: Option<EpisodeSelection>,

    /// Target resolution, e.g. 1080p or 720
    #[arg(short, long, default_value = "1080p")]
    resolution: Resolution,

    /// Which audio variants to download
    #[arg(short, long, value_enum, default_value_t = ModeArg::Both)]
    mode: ModeArg,

    /// Release group tag stamped into the file name and metadata
    #[arg(short, long, default_value = "NOGRP")]
    group_tag: String,

    /// Directory receiving the muxed files
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Directory receiving temporary downloads
    #[arg(long, default_value = ".")]
    work_dir: PathBuf,

    /// Output container
    #[arg(long, value_enum, default_value_t = ContainerArg::Mp4)]
    container: ContainerArg,

    /// Base URL of the Consumet-compatible metadata API
    #[arg(long, default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Preferred streaming server, e.g. vidstreaming
    #[arg(long)]
    server: Option<String>,

    /// Path to the N_m3u8DL-RE binary
    #[arg(long, default_value = DEFAULT_DOWNLOADER)]
    downloader: PathBuf,

    /// Path to the ffmpeg binary (looked up automatically if omitted)
    #[arg(long)]
    ffmpeg: Option<PathBuf>,

    /// Timeout in seconds for metadata and subtitle requests
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    /// Do not cache show metadata on disk
    #[arg(long)]
    no_cache: bool,

    /// Do not ask before downloading a whole series
    #[arg(short, long)]
    yes: bool,

    /// Increase diagnostic output (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    Sub,
    Dub,
    Both,
}

impl From<ModeArg> for DownloadMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Sub => DownloadMode::Sub,
            ModeArg::Dub => DownloadMode::Dub,
            ModeArg::Both => DownloadMode::Both,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ContainerArg {
    Mp4,
    Mkv,
}

impl From<ContainerArg> for Container {
    fn from(container: ContainerArg) -> Self {
        match container {
            ContainerArg::Mp4 => Container::Mp4,
            ContainerArg::Mkv => Container::Mkv,
        }
    }
}

impl Cli {
    fn into_config(self) -> DownloadConfig {
        DownloadConfig {
            source_url: self.url,
            season: self.season,
            episodes: self.episode.unwrap_or_default(),
            resolution: self.resolution,
            mode: self.mode.into(),
            group_tag: self.group_tag,
            output_dir: self.output_dir,
            work_dir: self.work_dir,
            container: self.container.into(),
            api_url: self.api_url,
            server: self.server,
            downloader_path: self.downloader,
            ffmpeg_path: self.ffmpeg,
            http_timeout: Duration::from_secs(self.timeout),
            use_cache: !self.no_cache,
        }
    }
}

/// Handles progress events and prints formatted output to stdout
fn handle_progress_event(event: ProgressEvent) {
    match event {
        ProgressEvent::Started { source_url, show_id } => {
            println!("zoro-dl: Starting download of {} ({})...", show_id, source_url);
        }
        ProgressEvent::FetchingMetadata { show_id } => {
            println!("\n=== Fetching Show Metadata ===");
            println!("Retrieving episode list for '{}'...", show_id);
        }
        ProgressEvent::MetadataResolved {
            title,
            episode_count,
        } => {
            println!("Found {} episode(s) for '{}'", episode_count, title);
        }
        ProgressEvent::EpisodesSelected { episodes } => {
            if episodes.is_empty() {
                println!("No episodes selected.");
            } else {
                println!("Selected {} episode(s)\n", episodes.len());
            }
        }
        ProgressEvent::ProcessingEpisode {
            index,
            total,
            episode,
            title,
        } => {
            println!("[{}/{}] Episode {}: {}", index + 1, total, episode, title);
        }
        ProgressEvent::StreamsSelected { modes, .. } => {
            let modes: Vec<String> = modes.iter().map(|m| m.to_string()).collect();
            println!("  Streams: {}", modes.join(", "));
        }
        ProgressEvent::SourcesFetched {
            video_count,
            subtitle_count,
            ..
        } => {
            println!(
                "  Found {} video source(s) and {} subtitle track(s)",
                video_count, subtitle_count
            );
        }
        ProgressEvent::DownloadingVideo { mode, .. } => {
            println!("  Downloading {} video...", mode);
        }
        ProgressEvent::DownloadingSubtitle { language, .. } => {
            println!("  Downloading {} subtitles...", language);
        }
        ProgressEvent::SubtitleSkipped {
            language, reason, ..
        } => {
            println!("  Skipping {} subtitles: {}", language, reason);
        }
        ProgressEvent::Muxing { .. } => {
            println!("  Muxing...");
        }
        ProgressEvent::Muxed { output_path, .. } => {
            match fs::metadata(&output_path) {
                Ok(metadata) => println!(
                    "  Wrote {} ({})",
                    output_path.display(),
                    format_size(metadata.len(), DECIMAL)
                ),
                Err(_) => println!("  Wrote {}", output_path.display()),
            }
        }
        ProgressEvent::CleanedUp { removed, .. } => {
            println!("  Removed {} temporary file(s)", removed);
        }
        ProgressEvent::EpisodeComplete { elapsed, .. } => {
            println!("  Done in {:.1}s\n", elapsed.as_secs_f64());
        }
        ProgressEvent::Complete { processed } => {
            println!("Download complete! Processed {} episode(s).", processed);
        }
    }
}

/// Asks before an unbounded run over every episode of a show
fn confirm_whole_series(url: &str) -> bool {
    Confirm::new()
        .with_prompt(format!(
            "No episode given. Download every episode of {}?",
            url
        ))
        .default(false)
        .interact()
        .unwrap_or(false)
}

fn print_error_chain(error: &dyn Error) {
    eprintln!("\nError: {}", error);

    let mut source = error.source();
    while let Some(cause) = source {
        eprintln!("  Caused by: {}", cause);
        source = cause.source();
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let whole_series = cli.episode.is_none();
    let skip_confirmation = cli.yes;
    let config = cli.into_config();

    if whole_series && !skip_confirmation && !confirm_whole_series(&config.source_url) {
        println!("Aborted.");
        return;
    }

    match download_show(&config, handle_progress_event) {
        Ok(outputs) => {
            if outputs.is_empty() {
                return;
            }

            println!("\n=== Output Files ===\n");
            for output in &outputs {
                println!("  E{:02}: {}", output.episode, output.output_path.display());
            }
        }
        Err(e) => {
            print_error_chain(&e);
            process::exit(1);
        }
    }
}
