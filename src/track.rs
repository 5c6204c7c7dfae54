//! Track model and the discovery interface
//!
//! Tracks are produced by an external discovery step. This crate only writes
//! the acquisition fields: search id, owner, file, size and `present`.

use crate::error::{AcquireError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub title: String,
    /// Title with featuring credits and version tags removed
    pub clean_title: String,
    pub artist: String,
    pub main_artist: String,
    #[serde(default)]
    pub album: String,
    /// Duration in milliseconds, `<= 0` when unknown
    #[serde(default)]
    pub duration: i64,

    /// Remote search id, set once the search completed with results
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_id: Option<String>,
    /// Remote username the download was queued from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    /// Remote filename while queued; the local basename once present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub present: bool,
}

impl Track {
    pub fn new(title: &str, artist: &str) -> Self {
        Self {
            title: title.to_string(),
            clean_title: title.to_string(),
            artist: artist.to_string(),
            main_artist: artist.to_string(),
            ..Default::default()
        }
    }

    /// `"<clean title> - <artist>"`, used as search text and in log lines
    pub fn details(&self) -> String {
        format!("{} - {}", self.clean_title, self.artist)
    }

    pub fn is_queued(&self) -> bool {
        self.owner.as_deref().is_some_and(|o| !o.is_empty())
    }

    /// Key for download tracking: `owner|filename`
    pub fn download_key(&self) -> String {
        format!(
            "{}|{}",
            self.owner.as_deref().unwrap_or_default(),
            self.file.as_deref().unwrap_or_default()
        )
    }
}

/// Source of candidate tracks for a run.
pub trait TrackSource {
    fn discover(&self) -> Result<Vec<Track>>;
}

/// Reads a JSON array of tracks from a file.
pub struct JsonTrackSource {
    path: PathBuf,
}

impl JsonTrackSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl TrackSource for JsonTrackSource {
    fn discover(&self) -> Result<Vec<Track>> {
        let text = std::fs::read_to_string(&self.path).map_err(|source| AcquireError::Io {
            path: self.path.clone(),
            source,
        })?;
        crate::http::parse_response(&self.path.display().to_string(), &text)
    }
}
