//! Repair song.ini files so the background video loads and stays in sync.
//!
//! Adds `video = video.webm` where a video exists but is not referenced and
//! keeps `video_start_time` equal to the chart's Gap.
//!
//! Usage: sync-ini <songs_folder> [--log-only] [--stats <stats.json>]

use anyhow::{Context, Result};
use song_video_sync::progress::{format_duration, is_log_only, set_log_only};
use song_video_sync::safety::validate_songs_root;
use song_video_sync::sync::sync_folder;
use song_video_sync::walker::walk;
use std::path::PathBuf;
use std::time::Duration;

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let positional: Vec<&String> = args
        .iter()
        .skip(1)
        .enumerate()
        .filter(|(i, a)| !a.starts_with("--") && args[*i] != "--stats")
        .map(|(_, a)| a)
        .collect();
    if positional.len() != 1 {
        eprintln!("Usage: sync-ini <path_to_songs_folder> [--log-only] [--stats <stats.json>]");
        std::process::exit(1);
    }

    let songs_root = PathBuf::from(positional[0]);
    let stats_path: Option<PathBuf> = args
        .iter()
        .position(|a| a == "--stats")
        .and_then(|i| args.get(i + 1))
        .map(PathBuf::from);
    set_log_only(args.iter().any(|a| a == "--log-only"));

    if let Err(e) = validate_songs_root(&songs_root) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    println!("--- Starting INI File Repair and Synchronization ---");
    let stats = walk(&songs_root, "Synchronizing song.ini", sync_folder)?;

    println!("\n--- Sync Summary ---");
    println!("Total song.ini files repaired/synchronized: {}", stats.changed);
    if stats.failed > 0 {
        println!("  Folders with errors: {}", stats.failed);
    }
    println!(
        "  Elapsed: {}",
        format_duration(Duration::from_secs_f64(stats.elapsed_seconds))
    );

    if is_log_only() {
        stats.log_phase("sync");
    }
    if let Some(path) = stats_path {
        stats
            .write_to_file(&path)
            .with_context(|| format!("Failed to write stats to {}", path.display()))?;
    }
    Ok(())
}
