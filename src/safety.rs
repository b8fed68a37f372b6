//! Safety checks run before any folder is touched.
//!
//! These catch a mistyped songs root or a conversion that would overwrite
//! its own input before an external tool gets to do damage.

use anyhow::{bail, Result};
use std::path::Path;

/// Validates that the songs root exists and is a directory.
pub fn validate_songs_root(root: &Path) -> Result<()> {
    if !root.exists() {
        bail!("Folder not found at {}", root.display());
    }
    if !root.is_dir() {
        bail!("{} is not a directory", root.display());
    }
    Ok(())
}

/// Validates that a conversion output is safe to overwrite: it must not be
/// the input file, since ffmpeg runs with `-y`.
pub fn validate_output_path(output: &Path, input: Option<&Path>) -> Result<()> {
    if let Some(input) = input {
        let same = match (output.canonicalize(), input.canonicalize()) {
            (Ok(a), Ok(b)) => a == b,
            _ => output == input,
        };
        if same {
            bail!(
                "Safety check failed: output '{}' cannot be the same as input '{}'",
                output.display(),
                input.display()
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_valid_songs_root() {
        let tmp = TempDir::new().unwrap();
        assert!(validate_songs_root(tmp.path()).is_ok());
    }

    #[test]
    fn test_missing_songs_root() {
        let result = validate_songs_root(Path::new("/nonexistent/songs/root"));
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Folder not found"));
    }

    #[test]
    fn test_songs_root_is_file() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("song.ini");
        fs::write(&file, "").unwrap();
        assert!(validate_songs_root(&file)
            .unwrap_err()
            .to_string()
            .contains("not a directory"));
    }

    #[test]
    fn test_valid_output() {
        let output = PathBuf::from("/tmp/songs/a/video.webm");
        let input = PathBuf::from("/tmp/downloads/clip.mp4");
        assert!(validate_output_path(&output, Some(&input)).is_ok());
        assert!(validate_output_path(&output, None).is_ok());
    }

    #[test]
    fn test_output_equals_input() {
        let path = PathBuf::from("/tmp/songs/a/video.webm");
        let result = validate_output_path(&path, Some(&path));
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("cannot be the same as input"));
    }

    #[test]
    fn test_output_extension_not_restricted() {
        let output = PathBuf::from("/tmp/songs/a/video.mkv");
        let input = PathBuf::from("/tmp/downloads/clip.mp4");
        assert!(validate_output_path(&output, Some(&input)).is_ok());
    }

    #[test]
    fn test_output_equals_input_through_relative_path() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("clip.mp4");
        fs::write(&input, "").unwrap();
        let output = tmp.path().join(".").join("clip.mp4");
        assert!(validate_output_path(&output, Some(&input)).is_err());
    }
}
