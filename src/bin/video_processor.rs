//! Manual video download / conversion for a single song.
//!
//! Usage:
//!   video-processor download <url> <output.webm> <max_width> <max_bitrate>
//!   video-processor convert <input> <output.webm> <max_width> <max_bitrate>

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use song_video_sync::config::{default_install_dir, validate_bitrate, validate_width, VideoSettings};
use song_video_sync::safety::validate_output_path;
use song_video_sync::video::{
    convert_command, download_command, CommandRunner, Invocation, ProcessRunner, ToolLocator,
    FFMPEG, YT_DLP,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "video-processor")]
#[command(about = "Download a video by URL or convert an existing file to a game-ready webm")]
struct Args {
    #[command(subcommand)]
    mode: Mode,

    /// Directory holding bundled yt-dlp/ffmpeg (default: next to this executable)
    #[arg(long, global = true)]
    install_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Mode {
    /// Download a video from a direct URL and recode it to webm
    Download {
        url: String,
        output: PathBuf,
        max_width: String,
        max_bitrate: String,
    },
    /// Convert an existing video file to webm
    Convert {
        input: PathBuf,
        output: PathBuf,
        max_width: String,
        max_bitrate: String,
    },
}

fn settings(max_width: &str, max_bitrate: &str) -> Result<VideoSettings> {
    let (max_width, clamped) = validate_width(max_width)?;
    if clamped {
        println!("Warning: Resolution width is too low. Using 640 as minimum.");
    }
    Ok(VideoSettings {
        max_width,
        max_bitrate: validate_bitrate(max_bitrate)?,
    })
}

fn build(args: Args) -> Result<Invocation> {
    let install_dir = match args.install_dir {
        Some(dir) => dir,
        None => default_install_dir()?,
    };
    let locator = ToolLocator::new(install_dir);

    match args.mode {
        Mode::Download {
            url,
            output,
            max_width,
            max_bitrate,
        } => {
            validate_output_path(&output, None)?;
            let settings = settings(&max_width, &max_bitrate)?;
            let yt_dlp = locator.require(YT_DLP)?;
            let ffmpeg = locator.find(FFMPEG);
            Ok(download_command(
                &yt_dlp,
                ffmpeg.as_deref(),
                &url,
                &output,
                &settings,
            ))
        }
        Mode::Convert {
            input,
            output,
            max_width,
            max_bitrate,
        } => {
            if !input.is_file() {
                bail!("Input file not found: {}", input.display());
            }
            validate_output_path(&output, Some(&input))?;
            let settings = settings(&max_width, &max_bitrate)?;
            let ffmpeg = locator.require(FFMPEG)?;
            Ok(convert_command(&ffmpeg, &input, &output, &settings))
        }
    }
}

fn main() -> Result<()> {
    let invocation = build(Args::parse())?;

    println!("Executing command: {}", invocation.display());
    let status = ProcessRunner.run(&invocation)?;
    if !status.success() {
        eprintln!(
            "\nERROR: External program failed with code {}",
            status.describe()
        );
        eprintln!("Command: {}", invocation.display());
        std::process::exit(1);
    }

    println!("External program finished successfully.");
    Ok(())
}
