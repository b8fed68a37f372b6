//! song.ini repair and video synchronization.
//!
//! Keeps `video_start_time` equal to the chart's `Gap` and adds
//! `video = video.webm` when a video sits next to a song.ini that does not
//! reference one. All other lines are left exactly as they were.

use crate::ini::{IniDocument, Line, LineKind};
use crate::models::{FolderOutcome, SongFolder, NOTES_CHART, SONG_INI, VIDEO_FILE};
use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::Path;

const SONG_SECTION: &str = "song";

/// Header the engine writes; new directives go right below it.
const SONG_HEADER: &str = "[Song]";

static GAP_VALUE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?[0-9]+(\.[0-9]+)?$").unwrap());

static START_TIME_VALUE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?[0-9]+$").unwrap());

/// What a pass over the song.ini found.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SyncScan {
    pub gap_ms: i64,
    pub video_start_found: bool,
    pub video_entry_found: bool,
    pub video_file_exists: bool,
    /// Lines to keep, in order. Old `video_start_time` lines are dropped.
    pub retained: IniDocument,
}

impl SyncScan {
    pub fn needs_video_entry(&self) -> bool {
        self.video_file_exists && !self.video_entry_found
    }

    pub fn needs_start_time(&self) -> bool {
        self.video_start_found || self.gap_ms != 0
    }

    pub fn needs_rewrite(&self) -> bool {
        self.needs_video_entry() || self.needs_start_time()
    }
}

fn key_value<'a>(line: &'a Line, wanted: &str) -> Option<&'a str> {
    match &line.kind {
        LineKind::KeyValue { key, value } if key.eq_ignore_ascii_case(wanted) => {
            Some(value.as_str())
        }
        _ => None,
    }
}

/// Truncates a decimal Gap value toward zero.
fn parse_gap(value: &str) -> Option<i64> {
    if !GAP_VALUE.is_match(value) {
        return None;
    }
    value.parse::<f64>().ok().map(|ms| ms as i64)
}

/// Scans `doc` for Gap and video directives inside `[song]`.
pub fn scan(doc: &IniDocument, video_file_exists: bool) -> SyncScan {
    let mut result = SyncScan {
        video_file_exists,
        ..Default::default()
    };
    let mut gap_found = false;

    for (section, line) in doc.iter_sections() {
        if section.as_deref() == Some(SONG_SECTION) {
            if !gap_found {
                if let Some(gap) = key_value(line, "gap").and_then(parse_gap) {
                    result.gap_ms = gap;
                    gap_found = true;
                }
            }

            if key_value(line, "video_start_time").is_some_and(|v| START_TIME_VALUE.is_match(v)) {
                result.video_start_found = true;
                continue;
            }

            if key_value(line, "video").is_some() {
                result.video_entry_found = true;
            }
        }
        result.retained.lines.push(line.clone());
    }

    result
}

/// Builds the rewritten document, or `None` if the file should be left alone.
pub fn plan(scan: &SyncScan) -> Option<IniDocument> {
    if !scan.needs_rewrite() {
        return None;
    }

    let mut doc = scan.retained.clone();
    let mut cursor = match doc.lines.iter().position(|l| l.trimmed() == SONG_HEADER) {
        Some(idx) => idx,
        None => {
            let eol = doc.line_ending();
            if doc.lines.last().is_some_and(|l| !l.has_terminator()) {
                doc.terminate_last_line();
            } else {
                doc.lines.push(Line::parse(eol));
            }
            doc.lines.push(Line::parse(&format!("{SONG_HEADER}{eol}")));
            doc.lines.len() - 1
        }
    };

    if scan.needs_video_entry() {
        doc.insert_after(cursor, &format!("video = {VIDEO_FILE}"));
        cursor += 1;
    }
    if scan.needs_start_time() {
        doc.insert_after(cursor, &format!("video_start_time = {}", scan.gap_ms));
    }
    Some(doc)
}

/// Synchronizes the song.ini in `folder`. Returns whether it was rewritten.
pub fn sync_entry(folder: &Path) -> Result<bool> {
    let ini_path = folder.join(SONG_INI);
    let text = fs::read_to_string(&ini_path)
        .with_context(|| format!("Failed to read {}", ini_path.display()))?;
    let doc = IniDocument::parse(&text);
    let scan = scan(&doc, folder.join(VIDEO_FILE).exists());

    let Some(updated) = plan(&scan) else {
        return Ok(false);
    };

    println!(" -> Found Gap: {}ms", scan.gap_ms);
    if scan.needs_video_entry() {
        println!(" -> Added: video = {VIDEO_FILE}");
    }
    if scan.needs_start_time() {
        println!(" -> Set: video_start_time = {}", scan.gap_ms);
    }

    fs::write(&ini_path, updated.render())
        .with_context(|| format!("Failed to write {}", ini_path.display()))?;
    Ok(true)
}

/// Walker action for the sync pass.
pub fn sync_folder(folder: &SongFolder) -> Result<FolderOutcome> {
    if !folder.has_ini {
        let reason = if folder.has_chart {
            format!("only {NOTES_CHART} present, no {SONG_INI} to synchronize")
        } else {
            format!("no {SONG_INI} to synchronize")
        };
        return Ok(FolderOutcome::Skipped(reason));
    }
    println!("\n[Checking: {}]", folder.name());
    if sync_entry(&folder.path)? {
        Ok(FolderOutcome::Changed)
    } else {
        println!(" -> No video found or no synchronization needed. Skipping.");
        Ok(FolderOutcome::Unchanged)
    }
}
