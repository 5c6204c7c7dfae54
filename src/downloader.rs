//! Batch driver: acquire a list of tracks in one run.

use crate::config::Config;
use crate::output;
use crate::slskd::Slskd;
use crate::track::Track;

/// Outcome of one batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub requested: usize,
    pub already_present: usize,
    pub queued: usize,
    pub downloaded: usize,
    pub failed: usize,
}

pub struct Downloader {
    slskd: Slskd,
}

impl Downloader {
    pub fn new(cfg: &Config) -> Self {
        Self {
            slskd: Slskd::new(cfg.slskd.clone(), cfg.download_dir.clone()),
        }
    }

    pub fn from_slskd(slskd: Slskd) -> Self {
        Self { slskd }
    }

    /// Search, filter and queue each missing track, then monitor the batch.
    ///
    /// A failing track is logged and dropped; it never stops the batch.
    /// On return `tracks` holds only tracks that are present.
    pub fn start_download(&self, tracks: &mut Vec<Track>) -> BatchReport {
        let mut report = BatchReport {
            requested: tracks.len(),
            ..Default::default()
        };
        let total = tracks.len();

        output::heading(&format!("Acquiring {} tracks", total));

        for (i, track) in tracks.iter_mut().enumerate() {
            if track.present {
                output::detail(&format!("{} already present, skipping", track.details()));
                report.already_present += 1;
                continue;
            }

            output::track_header(i + 1, total, &track.details());
            let result = self
                .slskd
                .query_track(track)
                .and_then(|()| self.slskd.get_track(track));

            match result {
                Ok(()) => {
                    output::detail(&format!(
                        "queued {} from {}",
                        track.file.as_deref().unwrap_or_default(),
                        track.owner.as_deref().unwrap_or_default()
                    ));
                    report.queued += 1;
                }
                Err(e) if e.is_remote() => {
                    output::error(&format!("{}: {}", track.details(), e));
                    report.failed += 1;
                }
                Err(e) => {
                    output::warning(&e.to_string());
                    report.failed += 1;
                }
            }
        }

        report.downloaded = self.slskd.monitor_downloads(tracks);
        tracks.retain(|t| t.present);
        report
    }
}
