//! Core data models shared by the downloader and synchronizer.
//!
//! This module contains the song folder layout, resolved metadata,
//! per-folder outcomes and the run statistics printed at the end of a pass.

use serde::Serialize;
use std::path::{Path, PathBuf};

// ============================================================================
// Song Folder Layout
// ============================================================================

/// Structured metadata file (primary metadata source, rewritten by sync).
pub const SONG_INI: &str = "song.ini";

/// Chart file (fallback metadata source, never written).
pub const NOTES_CHART: &str = "notes.chart";

/// Background video the game engine looks for.
pub const VIDEO_FILE: &str = "video.webm";

/// Placeholder artist/title used by chart editors when nothing was filled in.
pub const UNKNOWN: &str = "Unknown";

/// A directory that directly contains a song.ini or a notes.chart.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SongFolder {
    pub path: PathBuf,
    pub has_ini: bool,
    pub has_chart: bool,
}

impl SongFolder {
    /// Returns `None` when `path` holds neither metadata file.
    pub fn inspect(path: &Path) -> Option<Self> {
        let has_ini = path.join(SONG_INI).is_file();
        let has_chart = path.join(NOTES_CHART).is_file();
        if !has_ini && !has_chart {
            return None;
        }
        Some(Self {
            path: path.to_path_buf(),
            has_ini,
            has_chart,
        })
    }

    pub fn video_path(&self) -> PathBuf {
        self.path.join(VIDEO_FILE)
    }

    pub fn has_video(&self) -> bool {
        self.video_path().exists()
    }

    /// Folder name for progress lines.
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

// ============================================================================
// Metadata
// ============================================================================

/// Artist and title of a song, both trimmed and non-empty.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Metadata {
    pub artist: String,
    pub title: String,
}

impl Metadata {
    /// Builds metadata from raw values, rejecting blanks.
    pub fn from_parts(artist: &str, title: &str) -> Option<Self> {
        let artist = artist.trim();
        let title = title.trim();
        if artist.is_empty() || title.is_empty() {
            return None;
        }
        Some(Self {
            artist: artist.to_string(),
            title: title.to_string(),
        })
    }

    /// False for the "Unknown" placeholder, which would only ever find
    /// unrelated videos.
    pub fn is_acquirable(&self) -> bool {
        self.artist != UNKNOWN && self.title != UNKNOWN
    }
}

// ============================================================================
// Per-folder Outcome
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FolderOutcome {
    /// A video was downloaded or the song.ini was rewritten.
    Changed,
    /// Nothing to do (video already present, no sync needed).
    Unchanged,
    /// The folder could not be processed, with a reason for the log.
    Skipped(String),
}

// ============================================================================
// Statistics
// ============================================================================

/// Counters for one walk over a songs root.
#[derive(Default, Debug, Clone, Serialize)]
pub struct RunStats {
    pub song_folders: usize,
    pub changed: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub failed: usize,

    // Timing
    pub elapsed_seconds: f64,
}

impl RunStats {
    pub fn record(&mut self, outcome: &FolderOutcome) {
        self.song_folders += 1;
        match outcome {
            FolderOutcome::Changed => self.changed += 1,
            FolderOutcome::Unchanged => self.unchanged += 1,
            FolderOutcome::Skipped(_) => self.skipped += 1,
        }
    }

    pub fn record_failure(&mut self) {
        self.song_folders += 1;
        self.failed += 1;
    }

    /// Log stats to stderr in JSON format
    pub fn log_phase(&self, phase: &str) {
        if let Ok(json) = serde_json::to_string_pretty(self) {
            eprintln!("[STATS:{}]\n{}", phase, json);
        }
    }

    /// Write stats to a JSON file
    pub fn write_to_file(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_inspect_requires_metadata_file() {
        let tmp = TempDir::new().unwrap();
        assert!(SongFolder::inspect(tmp.path()).is_none());

        fs::write(tmp.path().join(NOTES_CHART), "[Song]\n").unwrap();
        let folder = SongFolder::inspect(tmp.path()).unwrap();
        assert!(folder.has_chart);
        assert!(!folder.has_ini);
        assert!(!folder.has_video());
    }

    #[test]
    fn test_metadata_rejects_blank_parts() {
        assert!(Metadata::from_parts("  ", "Everlong").is_none());
        assert!(Metadata::from_parts("Foo Fighters", "").is_none());
        let meta = Metadata::from_parts(" Foo Fighters ", "Everlong\t").unwrap();
        assert_eq!(meta.artist, "Foo Fighters");
        assert_eq!(meta.title, "Everlong");
    }

    #[test]
    fn test_unknown_is_not_acquirable() {
        assert!(!Metadata::from_parts(UNKNOWN, "Song").unwrap().is_acquirable());
        assert!(!Metadata::from_parts("Band", UNKNOWN).unwrap().is_acquirable());
        assert!(Metadata::from_parts("Band", "Song").unwrap().is_acquirable());
    }

    #[test]
    fn test_stats_record() {
        let mut stats = RunStats::default();
        stats.record(&FolderOutcome::Changed);
        stats.record(&FolderOutcome::Unchanged);
        stats.record(&FolderOutcome::Skipped("no metadata".into()));
        stats.record_failure();
        assert_eq!(stats.song_folders, 4);
        assert_eq!(stats.changed, 1);
        assert_eq!(stats.unchanged, 1);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.failed, 1);
    }

    #[test]
    fn test_stats_write_to_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("stats.json");
        let stats = RunStats {
            changed: 2,
            ..Default::default()
        };
        stats.write_to_file(&path).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["changed"], 2);
    }
}
