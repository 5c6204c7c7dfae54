//! slskd acquisition pipeline
//!
//! Per track: [`Slskd::query_track`] opens and polls a search,
//! [`Slskd::get_track`] collects and filters candidates and queues the first
//! one the daemon accepts. Once every track has been queued,
//! [`Slskd::monitor_downloads`] follows the transfers to completion.

mod collect;
mod migrate;
mod monitor;
mod queue;
mod search;
pub mod types;

pub use collect::{collect_files, filter_files, sanitize_name};
pub use migrate::{move_download, parse_path};
pub use monitor::{DownloadTracker, MonitorEvent, ProgressStore};

use crate::config::SlskdConfig;
use crate::error::Result;
use crate::http::HttpClient;
use crate::track::Track;
use std::path::PathBuf;

/// Client for one slskd daemon
pub struct Slskd {
    client: HttpClient,
    cfg: SlskdConfig,
    download_dir: PathBuf,
}

impl Slskd {
    pub fn new(cfg: SlskdConfig, download_dir: impl Into<PathBuf>) -> Self {
        let client = HttpClient::new(&cfg.url, cfg.api_key.clone(), cfg.timeout);
        Self::with_client(client, cfg, download_dir)
    }

    /// Use an existing HTTP client, shared with other components of the run.
    pub fn with_client(client: HttpClient, cfg: SlskdConfig, download_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            cfg,
            download_dir: download_dir.into(),
        }
    }

    pub fn config(&self) -> &SlskdConfig {
        &self.cfg
    }

    /// Fetch search responses, collect and filter candidates, then queue one.
    ///
    /// The track's search is deleted when no candidate survives.
    pub fn get_track(&self, track: &mut Track) -> Result<()> {
        let candidates = self.search_responses(track).and_then(|responses| {
            let files = collect_files(track, &responses, &self.cfg.filters)?;
            filter_files(files, &self.cfg.filters)
        });

        match candidates {
            Ok(filtered) => self.queue_download(&filtered, track),
            Err(e) => {
                if let Some(id) = track.search_id.as_deref() {
                    self.delete_search_logged(id);
                }
                Err(e)
            }
        }
    }
}
