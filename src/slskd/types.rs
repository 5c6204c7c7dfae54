//! Wire types for the slskd REST API (`/api/v0`).

use serde::{Deserialize, Serialize};

/// Search state as returned by `POST /searches` and `GET /searches/{id}`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Search {
    pub id: String,
    pub is_complete: bool,
    pub file_count: u32,
    pub locked_file_count: u32,
    pub response_count: u32,
    pub search_text: String,
    pub state: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest<'a> {
    pub search_text: &'a str,
}

/// One uploader's answer to a search
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchResponse {
    pub username: String,
    pub file_count: u32,
    pub files: Vec<SearchFile>,
    pub has_free_upload_slot: bool,
    pub locked_file_count: u32,
    pub queue_length: u64,
    pub upload_speed: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchFile {
    pub filename: String,
    pub extension: String,
    pub size: u64,
    /// Length in seconds
    pub length: Option<i64>,
    pub bit_rate: Option<u32>,
    pub bit_depth: Option<u32>,
    pub is_locked: bool,
}

/// A search file that passed collection, with its owner attached
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub filename: String,
    /// Normalized extension without the dot
    pub extension: String,
    pub bit_depth: Option<u32>,
    pub bit_rate: Option<u32>,
    pub length: Option<i64>,
    pub size: u64,
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct DownloadRequest<'a> {
    pub filename: &'a str,
    pub size: u64,
}

/// Per-user entry of `GET /transfers/downloads`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserTransfers {
    pub username: String,
    pub directories: Vec<TransferDirectory>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransferDirectory {
    pub directory: String,
    pub file_count: u32,
    pub files: Vec<Transfer>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Transfer {
    pub id: String,
    pub username: String,
    pub filename: String,
    pub size: u64,
    /// e.g. `"Queued, Remotely"`, `"InProgress"`, `"Completed, Succeeded"`
    pub state: String,
    pub bytes_transferred: u64,
    pub bytes_remaining: u64,
    pub percent_complete: f64,
}

impl Transfer {
    pub fn is_succeeded(&self) -> bool {
        self.bytes_remaining == 0 || self.percent_complete >= 100.0 || self.state.contains("Succeeded")
    }

    pub fn is_failed(&self) -> bool {
        self.state.contains("Errored") || self.state.contains("Cancelled")
    }
}
