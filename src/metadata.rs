//! Artist/title resolution for a song folder.
//!
//! song.ini is read first; notes.chart header fields are the fallback.
//! Anything unreadable or malformed is treated as absent.

use crate::ini::IniDocument;
use crate::models::{Metadata, NOTES_CHART, SONG_INI};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::Path;
use thiserror::Error;

static CHART_ARTIST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)Artist\s*=\s*"([^"]+)""#).unwrap());

static CHART_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)Name\s*=\s*"([^"]+)""#).unwrap());

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MetadataError {
    #[error("could not find Artist/Name metadata")]
    NotFound,
}

/// Resolves artist and title for the folder at `folder`.
pub fn resolve(folder: &Path) -> Result<Metadata, MetadataError> {
    let ini_path = folder.join(SONG_INI);
    if let Some(meta) = fs::read_to_string(&ini_path)
        .ok()
        .and_then(|text| from_song_ini(&text))
    {
        return Ok(meta);
    }

    fs::read_to_string(folder.join(NOTES_CHART))
        .ok()
        .and_then(|text| from_chart(&text))
        .ok_or(MetadataError::NotFound)
}

/// Reads `name` and `artist` from the `[song]` section.
pub fn from_song_ini(text: &str) -> Option<Metadata> {
    let doc = IniDocument::parse(text);
    let artist = doc.get("song", "artist")?;
    let title = doc.get("song", "name")?;
    Metadata::from_parts(artist, title)
}

/// Searches the whole chart text for quoted `Artist` and `Name` fields.
pub fn from_chart(text: &str) -> Option<Metadata> {
    let artist = CHART_ARTIST.captures(text)?.get(1)?.as_str();
    let title = CHART_NAME.captures(text)?.get(1)?.as_str();
    Metadata::from_parts(artist, title)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn song_dir(ini: Option<&str>, chart: Option<&str>) -> TempDir {
        let tmp = TempDir::new().unwrap();
        if let Some(ini) = ini {
            fs::write(tmp.path().join(SONG_INI), ini).unwrap();
        }
        if let Some(chart) = chart {
            fs::write(tmp.path().join(NOTES_CHART), chart).unwrap();
        }
        tmp
    }

    #[test]
    fn test_song_ini_preferred() {
        let tmp = song_dir(
            Some("[Song]\nname = Everlong \nartist = Foo Fighters\n"),
            Some("[Song]\n{\n  Name = \"Other\"\n  Artist = \"Other\"\n}\n"),
        );
        let meta = resolve(tmp.path()).unwrap();
        assert_eq!(meta.artist, "Foo Fighters");
        assert_eq!(meta.title, "Everlong");
    }

    #[test]
    fn test_section_name_case_insensitive() {
        let meta = from_song_ini("[SONG]\nNAME = Song\nArtist = Band\n").unwrap();
        assert_eq!(meta.title, "Song");
        assert_eq!(meta.artist, "Band");
    }

    #[test]
    fn test_chart_fallback() {
        let chart = "[Song]\n{\n  name=\"Everlong\"\n  ARTIST = \"Foo Fighters\"\n  Charter = \"x\"\n}\n";
        let tmp = song_dir(None, Some(chart));
        let meta = resolve(tmp.path()).unwrap();
        assert_eq!(meta.artist, "Foo Fighters");
        assert_eq!(meta.title, "Everlong");
    }

    #[test]
    fn test_chart_fallback_compact_quotes() {
        let meta = from_chart("Artist=\"Foo Fighters\"\nName=\"Everlong\"").unwrap();
        assert_eq!(meta.artist, "Foo Fighters");
        assert_eq!(meta.title, "Everlong");
    }

    #[test]
    fn test_incomplete_ini_falls_back_to_chart() {
        let tmp = song_dir(
            Some("[song]\nname = Everlong\n"),
            Some("Name = \"Everlong\"\nArtist = \"Foo Fighters\"\n"),
        );
        assert_eq!(resolve(tmp.path()).unwrap().artist, "Foo Fighters");
    }

    #[test]
    fn test_not_found() {
        let tmp = song_dir(Some("[other]\nname = x\nartist = y\n"), None);
        assert_eq!(resolve(tmp.path()), Err(MetadataError::NotFound));

        let tmp = song_dir(None, Some("Name = \"   \"\nArtist = \"Band\"\n"));
        assert_eq!(resolve(tmp.path()), Err(MetadataError::NotFound));

        let tmp = song_dir(None, None);
        assert_eq!(resolve(tmp.path()), Err(MetadataError::NotFound));
    }

    #[test]
    fn test_unreadable_ini_is_swallowed() {
        let tmp = song_dir(None, Some("Name = \"Song\"\nArtist = \"Band\"\n"));
        fs::write(tmp.path().join(SONG_INI), [0xff, 0xfe, 0x00, 0x5b]).unwrap();
        assert_eq!(resolve(tmp.path()).unwrap().title, "Song");
    }
}
