//! Download queueing: try each candidate in order until one is accepted.

use super::Slskd;
use super::types::{Candidate, DownloadRequest};
use crate::error::{AcquireError, Result};
use crate::output;
use crate::track::Track;

pub(crate) const DOWNLOADS: &str = "/api/v0/transfers/downloads";

impl Slskd {
    /// Queue the first candidate the daemon accepts and record it on `track`.
    ///
    /// A rejected candidate is logged and the next one is tried; the same
    /// candidate is never retried. When every candidate fails the track's
    /// search is deleted and `QueueExhausted` is returned.
    pub fn queue_download(&self, files: &[Candidate], track: &mut Track) -> Result<()> {
        self.queue_first_accepted(files, track, |message| output::warning(&message))
    }

    /// Same as `queue_download`, handing each rejection line to `on_reject`.
    pub(crate) fn queue_first_accepted(
        &self,
        files: &[Candidate],
        track: &mut Track,
        mut on_reject: impl FnMut(String),
    ) -> Result<()> {
        let total = files.len();

        for (i, file) in files.iter().enumerate() {
            let endpoint = format!("{}/{}", DOWNLOADS, urlencoding::encode(&file.username));
            let payload = [DownloadRequest {
                filename: &file.filename,
                size: file.size,
            }];

            match self.client.post(&endpoint, &payload) {
                Ok(()) => {
                    track.owner = Some(file.username.clone());
                    track.file = Some(file.filename.clone());
                    track.size = file.size;
                    return Ok(());
                }
                Err(e) => on_reject(rejection_message(i + 1, total, track, &e)),
            }
        }

        if let Some(id) = track.search_id.as_deref() {
            self.delete_search_logged(id);
        }
        Err(AcquireError::QueueExhausted(track.details()))
    }
}

/// `[2/3] failed to queue download for 'Song - Band': got 500 from ...`
fn rejection_message(attempt: usize, total: usize, track: &Track, err: &AcquireError) -> String {
    format!(
        "[{}/{}] failed to queue download for '{}': {}",
        attempt,
        total,
        track.details(),
        err
    )
}
