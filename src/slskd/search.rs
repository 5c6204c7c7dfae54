//! Search coordination: open a search for a track and poll it to completion.

use super::Slskd;
use super::types::{Search, SearchRequest, SearchResponse};
use crate::error::{AcquireError, Result};
use crate::output;
use crate::track::Track;
use std::thread;

const SEARCHES: &str = "/api/v0/searches";

impl Slskd {
    /// Search for `track` and wait until the search completes.
    ///
    /// On success the search id is attached to the track. On any failure the
    /// remote search is deleted (best-effort) and the track keeps no id.
    pub fn query_track(&self, track: &mut Track) -> Result<()> {
        if let Some(previous) = track.search_id.take() {
            self.delete_search_logged(&previous);
        }

        let id = self.search_track(track)?;
        let details = track.details();
        output::detail(&format!("initiating search for {}", details));

        match self.search_status(&id, &details) {
            Ok(()) => {
                track.search_id = Some(id);
                Ok(())
            }
            Err(e) => {
                self.delete_search_logged(&id);
                Err(e)
            }
        }
    }

    fn search_track(&self, track: &Track) -> Result<String> {
        let text = track.details();
        let search: Search = self
            .client
            .post_json(SEARCHES, &SearchRequest { search_text: &text })?;
        Ok(search.id)
    }

    /// Poll the search until it is complete or the retry budget runs out.
    fn search_status(&self, id: &str, details: &str) -> Result<()> {
        let endpoint = format!("{}/{}", SEARCHES, id);
        let retry = self.cfg.retry;
        let pb = output::spinner(&format!("searching for {}", details));

        let mut attempt = 0;
        let result = loop {
            let search: Search = match self.client.get_json(&endpoint) {
                Ok(s) => s,
                Err(e) => break Err(e),
            };

            if search.is_complete {
                if search.file_count > search.locked_file_count {
                    break Ok(());
                }
                break Err(AcquireError::NoResults(details.to_string()));
            }

            if attempt >= retry {
                output::debug(&format!("search not completed for ID: {}", id));
                break Err(AcquireError::SearchTimeout {
                    track: details.to_string(),
                    retries: attempt,
                });
            }

            output::debug(&format!("[{}/{}] Searching for {}", attempt, retry, details));
            pb.set_message(format!("searching for {} [{}/{}]", details, attempt + 1, retry));
            thread::sleep(self.cfg.timings.search_retry_delay);
            attempt += 1;
        };

        output::progress_done(pb);
        result
    }

    pub(crate) fn search_responses(&self, track: &Track) -> Result<Vec<SearchResponse>> {
        let id = track
            .search_id
            .as_deref()
            .ok_or(AcquireError::NotSearched("search id"))?;
        self.client.get_json(&format!("{}/{}/responses", SEARCHES, id))
    }

    pub(crate) fn delete_search(&self, id: &str) -> Result<()> {
        self.client.delete(&format!("{}/{}", SEARCHES, id))
    }

    /// Delete a search, logging instead of returning failures.
    pub(crate) fn delete_search_logged(&self, id: &str) {
        if let Err(e) = self.delete_search(id) {
            output::debug(&format!("failed to delete search {}: {}", id, e));
        }
    }
}
