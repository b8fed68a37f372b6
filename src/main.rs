use anyhow::{Context, Result};
use clap::Parser;
use song_video_sync::config::{default_install_dir, ConfigKey, ConfigStore};
use song_video_sync::progress::{format_duration, is_log_only, set_log_only};
use song_video_sync::safety::validate_songs_root;
use song_video_sync::video::{Acquirer, ProcessRunner, ToolLocator};
use song_video_sync::walker::walk;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "video-downloader")]
#[command(about = "Search, download and convert background videos for every song folder")]
struct Args {
    /// Root folder containing the song folders
    #[arg(required_unless_present_any = ["set_config", "get_config"])]
    songs_root: Option<PathBuf>,

    /// Update one setting, e.g. --set-config max_width 1920
    #[arg(
        long,
        num_args = 2,
        value_names = ["KEY", "VALUE"],
        conflicts_with_all = ["songs_root", "get_config"]
    )]
    set_config: Option<Vec<String>>,

    /// Print the current value of a setting
    #[arg(long, value_name = "KEY", conflicts_with = "songs_root")]
    get_config: Option<String>,

    /// Directory holding video_config.ini and bundled tools (default: next to this executable)
    #[arg(long)]
    install_dir: Option<PathBuf>,

    /// Hide the spinner and print plain progress lines
    #[arg(long)]
    log_only: bool,

    /// Write run statistics as JSON
    #[arg(long)]
    stats: Option<PathBuf>,
}

fn set_config(install_dir: &Path, key: &str, value: &str) -> Result<()> {
    let mut store = ConfigStore::load(install_dir)?;
    let key: ConfigKey = key.parse()?;
    let outcome = store.set(key, value)?;
    if outcome.clamped {
        println!("Warning: Resolution width is too low. Using 640 as minimum.");
    }
    println!(
        "SUCCESS: Configuration updated. {} set to {}",
        outcome.key, outcome.value
    );
    Ok(())
}

fn get_config(install_dir: &Path, key: &str) -> Result<()> {
    let store = ConfigStore::load(install_dir)?;
    let key: ConfigKey = key.parse()?;
    println!("{}", store.get(key));
    Ok(())
}

fn download_all(install_dir: &Path, root: &Path, stats_path: Option<&Path>) -> Result<()> {
    validate_songs_root(root)?;

    let store = ConfigStore::load(install_dir)?;
    let settings = store.settings();
    let locator = ToolLocator::new(install_dir);
    let mut acquirer = Acquirer::locate(&locator, settings, ProcessRunner)
        .context("yt-dlp is required to download videos")?;

    println!("--- Starting Automatic Video Search and Download ---");
    println!(
        "--- Current Max Resolution Width: {} | Max Bitrate: {} ---",
        acquirer.settings().max_width,
        acquirer.settings().max_bitrate
    );

    let stats = walk(root, "Downloading videos", |folder| acquirer.process(folder))?;

    println!("\n--- Download Summary ---");
    println!("Total new videos downloaded and converted: {}", stats.changed);
    println!(
        "  Song folders: {} (skipped {}, failed {})",
        stats.song_folders, stats.skipped, stats.failed
    );
    println!(
        "  Elapsed: {}",
        format_duration(Duration::from_secs_f64(stats.elapsed_seconds))
    );

    if is_log_only() {
        stats.log_phase("download");
    }
    if let Some(path) = stats_path {
        stats
            .write_to_file(path)
            .with_context(|| format!("Failed to write stats to {}", path.display()))?;
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    set_log_only(args.log_only);

    let install_dir = match args.install_dir {
        Some(dir) => dir,
        None => default_install_dir()?,
    };

    if let Some(pair) = args.set_config {
        return set_config(&install_dir, &pair[0], &pair[1]);
    }
    if let Some(key) = args.get_config {
        return get_config(&install_dir, &key);
    }

    let root = args.songs_root.context("Missing songs root folder")?;
    download_all(&install_dir, &root, args.stats.as_deref())
}
