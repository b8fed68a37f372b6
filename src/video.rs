//! yt-dlp / ffmpeg invocation.
//!
//! Tools are looked up next to the utility first and on `PATH` second.
//! Processes are started through [`CommandRunner`] so acquisition can be
//! exercised without the real binaries.

use crate::config::VideoSettings;
use crate::metadata;
use crate::models::{FolderOutcome, Metadata, SongFolder};
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use thiserror::Error;

pub const YT_DLP: &str = "yt-dlp";
pub const FFMPEG: &str = "ffmpeg";

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("{} not found in {} or on PATH", .name, .dir.display())]
    MissingExecutable { name: String, dir: PathBuf },
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
}

// ============================================================================
// Tool Discovery
// ============================================================================

/// Finds the external tools, preferring copies shipped in `install_dir`.
#[derive(Clone, Debug)]
pub struct ToolLocator {
    install_dir: PathBuf,
}

impl ToolLocator {
    pub fn new(install_dir: impl Into<PathBuf>) -> Self {
        Self {
            install_dir: install_dir.into(),
        }
    }

    pub fn find(&self, name: &str) -> Option<PathBuf> {
        let bundled = self
            .install_dir
            .join(format!("{name}{}", std::env::consts::EXE_SUFFIX));
        if bundled.is_file() {
            return Some(bundled);
        }
        which::which(name).ok()
    }

    pub fn require(&self, name: &str) -> Result<PathBuf, ToolError> {
        self.find(name).ok_or_else(|| ToolError::MissingExecutable {
            name: name.to_string(),
            dir: self.install_dir.clone(),
        })
    }
}

// ============================================================================
// Command Construction
// ============================================================================

/// A fully built external command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<OsString>,
}

impl Invocation {
    /// Shell-like rendering for progress output.
    pub fn display(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        for arg in &self.args {
            let arg = arg.to_string_lossy();
            if arg.contains(' ') {
                parts.push(format!("\"{arg}\""));
            } else {
                parts.push(arg.into_owned());
            }
        }
        parts.join(" ")
    }
}

/// Search target for a song: the first hit for its official video.
pub fn search_query(meta: &Metadata) -> String {
    format!("ytsearch1:{} - {} official video", meta.artist, meta.title)
}

/// Arguments yt-dlp hands to ffmpeg when recoding to webm.
pub fn postprocessor_args(settings: &VideoSettings) -> String {
    format!(
        "-vf scale={}:-2 -c:v libvpx -b:v {} -c:a libvorbis -quality good -speed 8 -threads 0",
        settings.max_width, settings.max_bitrate
    )
}

/// yt-dlp command downloading `target` (search query or URL) into `output`
/// as webm.
pub fn download_command(
    yt_dlp: &Path,
    ffmpeg: Option<&Path>,
    target: &str,
    output: &Path,
    settings: &VideoSettings,
) -> Invocation {
    let mut args: Vec<OsString> = vec![
        target.into(),
        "-f".into(),
        "bestvideo+bestaudio/best".into(),
    ];
    if let Some(ffmpeg) = ffmpeg {
        args.push("--ffmpeg-location".into());
        args.push(ffmpeg.into());
    }
    let tail: [OsString; 9] = [
        "--recode-video".into(),
        "webm".into(),
        "--postprocessor-args".into(),
        postprocessor_args(settings).into(),
        "-o".into(),
        output.into(),
        "--no-playlist".into(),
        "--quiet".into(),
        "--no-warnings".into(),
    ];
    args.extend(tail);
    Invocation {
        program: yt_dlp.to_path_buf(),
        args,
    }
}

/// ffmpeg command converting an existing file to a webm the game can play.
pub fn convert_command(
    ffmpeg: &Path,
    input: &Path,
    output: &Path,
    settings: &VideoSettings,
) -> Invocation {
    let args: Vec<OsString> = vec![
        "-i".into(),
        input.into(),
        "-vf".into(),
        format!("scale={}:-2", settings.max_width).into(),
        "-c:v".into(),
        "libvpx".into(),
        "-b:v".into(),
        settings.max_bitrate.clone().into(),
        "-c:a".into(),
        "libvorbis".into(),
        "-y".into(),
        output.into(),
    ];
    Invocation {
        program: ffmpeg.to_path_buf(),
        args,
    }
}

// ============================================================================
// Process Execution
// ============================================================================

/// Exit code of a finished process; `None` when killed by a signal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunStatus {
    pub code: Option<i32>,
}

impl RunStatus {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Exit code as text, or "signal".
    pub fn describe(&self) -> String {
        self.code
            .map(|c| c.to_string())
            .unwrap_or_else(|| "signal".to_string())
    }
}

impl From<ExitStatus> for RunStatus {
    fn from(status: ExitStatus) -> Self {
        Self {
            code: status.code(),
        }
    }
}

pub trait CommandRunner {
    /// Runs the command to completion.
    fn run(&mut self, invocation: &Invocation) -> Result<RunStatus, ToolError>;
}

/// Blocking runner backed by `std::process::Command`.
#[derive(Debug, Default)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run(&mut self, invocation: &Invocation) -> Result<RunStatus, ToolError> {
        let program = invocation.program.display().to_string();
        Command::new(&invocation.program)
            .args(&invocation.args)
            .status()
            .map(RunStatus::from)
            .map_err(|source| match source.kind() {
                io::ErrorKind::NotFound => ToolError::MissingExecutable {
                    name: program,
                    dir: invocation
                        .program
                        .parent()
                        .map(Path::to_path_buf)
                        .unwrap_or_default(),
                },
                _ => ToolError::Spawn { program, source },
            })
    }
}

// ============================================================================
// Acquisition
// ============================================================================

/// Downloads missing background videos into song folders.
pub struct Acquirer<R: CommandRunner> {
    yt_dlp: PathBuf,
    ffmpeg: Option<PathBuf>,
    settings: VideoSettings,
    runner: R,
}

impl<R: CommandRunner> Acquirer<R> {
    pub fn new(
        yt_dlp: PathBuf,
        ffmpeg: Option<PathBuf>,
        settings: VideoSettings,
        runner: R,
    ) -> Self {
        Self {
            yt_dlp,
            ffmpeg,
            settings,
            runner,
        }
    }

    /// Resolves the tools through `locator`. A missing yt-dlp is fatal.
    pub fn locate(locator: &ToolLocator, settings: VideoSettings, runner: R) -> Result<Self, ToolError> {
        let yt_dlp = locator.require(YT_DLP)?;
        let ffmpeg = locator.find(FFMPEG);
        Ok(Self::new(yt_dlp, ffmpeg, settings, runner))
    }

    pub fn settings(&self) -> &VideoSettings {
        &self.settings
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Returns `Ok(true)` when a new video was produced. Existing videos are
    /// never replaced; a failing download is reported and yields `Ok(false)`.
    pub fn acquire(&mut self, folder: &SongFolder, meta: &Metadata) -> Result<bool, ToolError> {
        if folder.has_video() {
            return Ok(false);
        }

        println!(
            " -> Searching & Downloading video for: {} - {}",
            meta.artist, meta.title
        );
        let invocation = download_command(
            &self.yt_dlp,
            self.ffmpeg.as_deref(),
            &search_query(meta),
            &folder.video_path(),
            &self.settings,
        );

        let status = self.runner.run(&invocation)?;
        if status.success() {
            println!(" -> Download and Conversion Complete.");
            Ok(true)
        } else {
            eprintln!(
                " -> ERROR: Download/Conversion failed for {} - {}. (Code: {})",
                meta.artist,
                meta.title,
                status.describe()
            );
            Ok(false)
        }
    }

    /// Resolves metadata for `folder` and downloads its video if missing.
    /// Folders without usable metadata are skipped.
    pub fn process(&mut self, folder: &SongFolder) -> anyhow::Result<FolderOutcome> {
        let meta = match metadata::resolve(&folder.path) {
            Ok(meta) if meta.is_acquirable() => meta,
            _ => {
                return Ok(FolderOutcome::Skipped(
                    "Could not find Artist/Name metadata.".to_string(),
                ))
            }
        };
        Ok(if self.acquire(folder, &meta)? {
            FolderOutcome::Changed
        } else {
            FolderOutcome::Unchanged
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Records invocations and answers with a fixed exit code.
    #[derive(Debug, Default)]
    pub struct RecordingRunner {
        pub calls: Vec<Invocation>,
        pub exit_code: i32,
        pub missing: bool,
    }

    impl CommandRunner for RecordingRunner {
        fn run(&mut self, invocation: &Invocation) -> Result<RunStatus, ToolError> {
            self.calls.push(invocation.clone());
            if self.missing {
                return Err(ToolError::MissingExecutable {
                    name: invocation.program.display().to_string(),
                    dir: PathBuf::new(),
                });
            }
            Ok(RunStatus {
                code: Some(self.exit_code),
            })
        }
    }
}
