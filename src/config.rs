//! Persistent video encoding settings (`video_config.ini`).
//!
//! The file lives in the tool's install directory. Missing files, sections
//! and keys are backfilled with defaults and written back on load.

use crate::ini::IniDocument;
use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::fs;
use std::num::IntErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

pub const CONFIG_FILE: &str = "video_config.ini";
pub const SECTION: &str = "video";

pub const DEFAULT_MAX_WIDTH: u32 = 1280;
pub const DEFAULT_MAX_BITRATE: &str = "2M";
pub const MIN_WIDTH: u32 = 640;

/// Bitrates like "2M", "1.5M" or "2000k".
static BITRATE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]+(\.[0-9]+)?[kKmMgG]$").unwrap());

/// Directory of the running executable, where the config file and any
/// bundled tools live.
pub fn default_install_dir() -> Result<PathBuf> {
    let exe = std::env::current_exe().context("Failed to locate the running executable")?;
    exe.parent()
        .map(Path::to_path_buf)
        .context("Executable has no parent directory")
}

// ============================================================================
// Keys and Errors
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigKey {
    MaxWidth,
    MaxBitrate,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 2] = [ConfigKey::MaxWidth, ConfigKey::MaxBitrate];

    pub fn as_str(self) -> &'static str {
        match self {
            ConfigKey::MaxWidth => "max_width",
            ConfigKey::MaxBitrate => "max_bitrate",
        }
    }

    pub fn default_value(self) -> String {
        match self {
            ConfigKey::MaxWidth => DEFAULT_MAX_WIDTH.to_string(),
            ConfigKey::MaxBitrate => DEFAULT_MAX_BITRATE.to_string(),
        }
    }

    fn valid_keys() -> String {
        Self::ALL.map(ConfigKey::as_str).join(", ")
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| ConfigError::UnknownKey {
                key: s.to_string(),
                valid: Self::valid_keys(),
            })
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid configuration key '{key}'. Valid keys are: {valid}")]
    UnknownKey { key: String, valid: String },
    #[error("Max resolution width must be an integer. Received: {0}")]
    InvalidWidth(String),
    #[error("Max resolution width is out of range. Received: {0}")]
    WidthOutOfRange(String),
    #[error("Max bitrate must be a value like 1.5M or 2000k. Received: {0}")]
    InvalidBitrate(String),
}

// ============================================================================
// Validation
// ============================================================================

/// Parses a width, raising it to [`MIN_WIDTH`] if needed.
/// Returns the width and whether it was clamped.
pub fn validate_width(value: &str) -> Result<(u32, bool), ConfigError> {
    let width = match value.trim().parse::<i64>() {
        Ok(width) => width,
        Err(e) => {
            return match e.kind() {
                IntErrorKind::NegOverflow => Ok((MIN_WIDTH, true)),
                IntErrorKind::PosOverflow => Err(ConfigError::WidthOutOfRange(value.to_string())),
                _ => Err(ConfigError::InvalidWidth(value.to_string())),
            }
        }
    };
    if width < MIN_WIDTH as i64 {
        return Ok((MIN_WIDTH, true));
    }
    let width =
        u32::try_from(width).map_err(|_| ConfigError::WidthOutOfRange(value.to_string()))?;
    Ok((width, false))
}

pub fn validate_bitrate(value: &str) -> Result<String, ConfigError> {
    if BITRATE_PATTERN.is_match(value) {
        Ok(value.to_string())
    } else {
        Err(ConfigError::InvalidBitrate(value.to_string()))
    }
}

// ============================================================================
// Store
// ============================================================================

/// Typed view of the `[video]` section.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VideoSettings {
    pub max_width: u32,
    pub max_bitrate: String,
}

impl Default for VideoSettings {
    fn default() -> Self {
        Self {
            max_width: DEFAULT_MAX_WIDTH,
            max_bitrate: DEFAULT_MAX_BITRATE.to_string(),
        }
    }
}

/// Result of a successful `set`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SetOutcome {
    pub key: ConfigKey,
    pub value: String,
    /// The width was below the minimum and was raised to it.
    pub clamped: bool,
}

#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    doc: IniDocument,
    created: bool,
}

impl ConfigStore {
    /// Loads the store from `install_dir`, creating or backfilling the file.
    pub fn load(install_dir: &Path) -> Result<Self> {
        let path = install_dir.join(CONFIG_FILE);
        let text = match fs::read_to_string(&path) {
            Ok(text) => Some(text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()))
            }
        };
        if text.is_none() {
            eprintln!(" -> Creating default config file at: {}", path.display());
        }

        let mut store = Self {
            path,
            doc: IniDocument::parse(text.as_deref().unwrap_or_default()),
            created: text.is_none(),
        };

        let mut backfilled = false;
        for key in ConfigKey::ALL {
            if store.doc.get(SECTION, key.as_str()).is_none() {
                store.doc.set(SECTION, key.as_str(), &key.default_value());
                backfilled = true;
            }
        }
        if backfilled {
            store.save()?;
        }
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True when `load` found no file and wrote a fresh one.
    pub fn was_created(&self) -> bool {
        self.created
    }

    pub fn save(&self) -> Result<()> {
        fs::write(&self.path, self.doc.render())
            .with_context(|| format!("Could not write to config file {}", self.path.display()))
    }

    /// Stored value of `key`, or its default.
    pub fn get(&self, key: ConfigKey) -> String {
        self.doc
            .get(SECTION, key.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| key.default_value())
    }

    /// Validates and stores `value`, persisting immediately. Nothing is
    /// written when validation fails.
    pub fn set(&mut self, key: ConfigKey, value: &str) -> Result<SetOutcome> {
        let (value, clamped) = match key {
            ConfigKey::MaxWidth => {
                let (width, clamped) = validate_width(value)?;
                (width.to_string(), clamped)
            }
            ConfigKey::MaxBitrate => (validate_bitrate(value)?, false),
        };
        self.doc.set(SECTION, key.as_str(), &value);
        self.save()?;
        Ok(SetOutcome { key, value, clamped })
    }

    /// Typed settings. Stored values that no longer validate fall back to
    /// their defaults for this run.
    pub fn settings(&self) -> VideoSettings {
        let defaults = VideoSettings::default();

        let width_text = self.get(ConfigKey::MaxWidth);
        let max_width = match validate_width(&width_text) {
            Ok((width, _)) => width,
            Err(e) => {
                eprintln!("Warning: {e}. Using {}.", defaults.max_width);
                defaults.max_width
            }
        };

        let bitrate_text = self.get(ConfigKey::MaxBitrate);
        let max_bitrate = validate_bitrate(&bitrate_text).unwrap_or_else(|e| {
            eprintln!("Warning: {e}. Using {}.", defaults.max_bitrate);
            defaults.max_bitrate.clone()
        });

        VideoSettings {
            max_width,
            max_bitrate,
        }
    }
}
