//! Recursive discovery of song folders and the per-folder driver loop.

use crate::models::{FolderOutcome, RunStats, SongFolder};
use crate::progress::{create_spinner, log_progress};
use crate::video::ToolError;
use anyhow::Result;
use std::path::Path;
use std::time::Instant;
use walkdir::WalkDir;

const LOG_INTERVAL: u64 = 100;

/// Errors that make every remaining folder pointless (the download tool is
/// gone) end the walk; anything else is reported and the walk moves on.
fn is_fatal(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<ToolError>(),
        Some(ToolError::MissingExecutable { .. })
    )
}

/// Song folders under `root` in depth-first, name-sorted order.
pub fn discover(root: &Path) -> impl Iterator<Item = SongFolder> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                eprintln!("Warning: skipping unreadable entry: {e}");
                None
            }
        })
        .filter(|entry| entry.file_type().is_dir())
        .filter_map(|entry| SongFolder::inspect(entry.path()))
}

/// Runs `action` on every song folder under `root`.
pub fn walk<F>(root: &Path, phase: &str, mut action: F) -> Result<RunStats>
where
    F: FnMut(&SongFolder) -> Result<FolderOutcome>,
{
    let start = Instant::now();
    let spinner = create_spinner(phase);
    let mut stats = RunStats::default();

    for folder in discover(root) {
        match spinner.suspend(|| action(&folder)) {
            Ok(outcome) => {
                if let FolderOutcome::Skipped(reason) = &outcome {
                    spinner.suspend(|| {
                        println!("Skipping folder '{}': {}", folder.name(), reason)
                    });
                }
                stats.record(&outcome);
            }
            Err(err) if is_fatal(&err) => {
                spinner.abandon();
                return Err(err);
            }
            Err(err) => {
                spinner.suspend(|| {
                    eprintln!("Error processing {}: {:#}", folder.path.display(), err)
                });
                stats.record_failure();
            }
        }
        spinner.inc(1);
        log_progress(phase, stats.song_folders as u64, LOG_INTERVAL);
    }

    stats.elapsed_seconds = start.elapsed().as_secs_f64();
    spinner.finish_with_message(format!("{phase}: {} song folders", stats.song_folders));
    Ok(stats)
}
