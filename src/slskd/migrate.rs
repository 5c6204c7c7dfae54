//! Relocating completed downloads out of the slskd download directory.
//!
//! slskd stores a finished file as `<slskd_dir>/<parent>/<file>`, where
//! `<parent>` is the last directory of the uploader's path.

use crate::error::{AcquireError, Result};
use crate::output;
use std::path::{Path, PathBuf};

/// Split a remote path into `(file name, parent directory name)`.
///
/// Remote paths usually use Windows separators:
/// `@@user\Music\Band\Song.flac` -> `("Song.flac", "Band")`
pub fn parse_path(remote: &str) -> (String, String) {
    let normalized = remote.replace('\\', "/");
    let path = Path::new(&normalized);

    let file = path
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let parent = path
        .parent()
        .and_then(|p| p.file_name())
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();

    (file, parent)
}

/// Move `<from_dir>/<parent>/<file>` to `<to_dir>/<parent>/<file>`.
///
/// Falls back to copy and remove when the directories are on different
/// filesystems. Returns the destination path.
pub fn move_download(from_dir: &Path, to_dir: &Path, parent: &str, file: &str) -> Result<PathBuf> {
    let src = from_dir.join(parent).join(file);
    let dest_dir = to_dir.join(parent);
    let dest = dest_dir.join(file);

    std::fs::create_dir_all(&dest_dir).map_err(|source| AcquireError::Io {
        path: dest_dir.clone(),
        source,
    })?;

    if std::fs::rename(&src, &dest).is_err() {
        output::debug(&format!("rename failed, copying {} -> {}", src.display(), dest.display()));
        std::fs::copy(&src, &dest).map_err(|source| AcquireError::Io {
            path: src.clone(),
            source,
        })?;
        std::fs::remove_file(&src).map_err(|source| AcquireError::Io {
            path: src.clone(),
            source,
        })?;
    }

    // Drop the slskd folder once it is empty
    let src_dir = from_dir.join(parent);
    if !parent.is_empty() && src_dir.read_dir().is_ok_and(|mut d| d.next().is_none()) {
        let _ = std::fs::remove_dir(&src_dir);
    }

    Ok(dest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_path_windows_separators() {
        let (file, parent) = parse_path("@@abcde\\Music\\Band\\Band - Song.flac");
        assert_eq!(file, "Band - Song.flac");
        assert_eq!(parent, "Band");
    }

    #[test]
    fn test_parse_path_unix_and_bare() {
        assert_eq!(parse_path("music/Album/track.mp3"), ("track.mp3".to_string(), "Album".to_string()));
        assert_eq!(parse_path("track.mp3"), ("track.mp3".to_string(), String::new()));
    }

    #[test]
    fn test_move_download_keeps_parent() {
        let from = TempDir::new().unwrap();
        let to = TempDir::new().unwrap();
        std::fs::create_dir_all(from.path().join("Band")).unwrap();
        std::fs::write(from.path().join("Band").join("Song.flac"), b"audio").unwrap();

        let dest = move_download(from.path(), to.path(), "Band", "Song.flac").unwrap();

        assert_eq!(dest, to.path().join("Band").join("Song.flac"));
        assert_eq!(std::fs::read(&dest).unwrap(), b"audio");
        assert!(!from.path().join("Band").exists());
    }

    #[test]
    fn test_move_download_missing_source() {
        let from = TempDir::new().unwrap();
        let to = TempDir::new().unwrap();
        let result = move_download(from.path(), to.path(), "Band", "Missing.flac");
        assert!(matches!(result, Err(AcquireError::Io { .. })));
    }
}
