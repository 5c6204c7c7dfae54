//! Acquisition error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while acquiring a track.
///
/// Transport, status and decode errors abort the current track only. The
/// batch driver logs them and moves on to the next track.
#[derive(Error, Debug)]
pub enum AcquireError {
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("got {status} from {url}")]
    RemoteStatus {
        status: u16,
        url: String,
        body: String,
    },

    #[error("error decoding response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("search complete, did not find any available files for {0}")]
    NoResults(String),

    #[error("search wasn't completed after {retries} retries, skipping {track}")]
    SearchTimeout { track: String, retries: u32 },

    #[error("no tracks passed collection for {0}")]
    NoCandidates(String),

    #[error("no files found that match filters")]
    NoFilterMatch,

    #[error("couldn't download track: {0}")]
    QueueExhausted(String),

    #[error("track has no {0} assigned")]
    NotSearched(&'static str),

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl AcquireError {
    /// Whether this error came from the HTTP boundary rather than from
    /// search or filter policy.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. } | Self::RemoteStatus { .. } | Self::Decode { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, AcquireError>;
