//! Download monitoring
//!
//! A single polling observer follows every queued track until it is either
//! present or skipped. Progress is kept in a [`ProgressStore`] owned by one
//! monitor run; each key is `owner|filename`.
//!
//! Per key:
//! - missing from the transfer list on 2 consecutive polls -> skipped
//! - zero bytes remaining, 100% or `Succeeded` -> present, tracker removed
//! - `Errored`/`Cancelled` state -> skipped
//! - bytes transferred increased -> progress recorded
//! - no progress for longer than the staleness window -> skipped

use super::Slskd;
use super::migrate::{move_download, parse_path};
use super::queue::DOWNLOADS;
use super::types::{Transfer, UserTransfers};
use crate::error::Result;
use crate::output;
use crate::track::Track;
use std::collections::HashMap;
use std::thread;
use std::time::{Duration, Instant};

/// Consecutive polls a download may be missing before it is skipped
const MAX_MISSES: u32 = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct DownloadTracker {
    pub last_bytes_transferred: u64,
    /// Consecutive polls without a matching transfer
    pub misses: u32,
    pub skipped: bool,
    pub last_updated: Instant,
    /// Last transfer id seen for this download
    pub transfer_id: Option<String>,
}

impl DownloadTracker {
    fn new(now: Instant) -> Self {
        Self {
            last_bytes_transferred: 0,
            misses: 0,
            skipped: false,
            last_updated: now,
            transfer_id: None,
        }
    }
}

/// Something the monitor has to act on after a poll
#[derive(Debug, Clone, PartialEq)]
pub enum MonitorEvent {
    Progress { index: usize, bytes_transferred: u64 },
    Completed { index: usize, transfer_id: String },
    Failed { index: usize, transfer_id: String, state: String },
    Stalled { index: usize, transfer_id: String },
    NotFound { index: usize },
}

#[derive(Debug, Default)]
pub struct ProgressStore {
    trackers: HashMap<String, DownloadTracker>,
}

impl ProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&DownloadTracker> {
        self.trackers.get(key)
    }

    pub fn is_skipped(&self, key: &str) -> bool {
        self.trackers.get(key).is_some_and(|t| t.skipped)
    }

    /// Apply one transfer-list snapshot to every unsettled track.
    ///
    /// Marks completed tracks present; everything needing remote cleanup
    /// or logging is returned as events.
    pub fn observe(
        &mut self,
        tracks: &mut [Track],
        status: &[UserTransfers],
        now: Instant,
        stale_after: Duration,
    ) -> Vec<MonitorEvent> {
        let mut events = Vec::new();

        for (index, track) in tracks.iter_mut().enumerate() {
            if track.present || !track.is_queued() {
                continue;
            }
            let key = track.download_key();
            if self.is_skipped(&key) {
                continue;
            }

            let tracker = self
                .trackers
                .entry(key.clone())
                .or_insert_with(|| DownloadTracker::new(now));

            let Some(transfer) = find_file(status, track) else {
                tracker.misses += 1;
                if tracker.misses >= MAX_MISSES {
                    tracker.skipped = true;
                    events.push(MonitorEvent::NotFound { index });
                }
                continue;
            };

            tracker.misses = 0;
            tracker.transfer_id = Some(transfer.id.clone());

            if transfer.is_succeeded() {
                track.present = true;
                self.trackers.remove(&key);
                events.push(MonitorEvent::Completed {
                    index,
                    transfer_id: transfer.id.clone(),
                });
            } else if transfer.is_failed() {
                tracker.skipped = true;
                events.push(MonitorEvent::Failed {
                    index,
                    transfer_id: transfer.id.clone(),
                    state: transfer.state.clone(),
                });
            } else if transfer.bytes_transferred > tracker.last_bytes_transferred {
                tracker.last_bytes_transferred = transfer.bytes_transferred;
                tracker.last_updated = now;
                events.push(MonitorEvent::Progress {
                    index,
                    bytes_transferred: transfer.bytes_transferred,
                });
            } else if now.saturating_duration_since(tracker.last_updated) > stale_after {
                tracker.skipped = true;
                events.push(MonitorEvent::Stalled {
                    index,
                    transfer_id: transfer.id.clone(),
                });
            }
        }

        events
    }

    /// True once every track is present or has a skipped tracker.
    ///
    /// Tracks that were never queued do not hold the batch open.
    pub fn all_settled(&self, tracks: &[Track]) -> bool {
        tracks.iter().all(|track| {
            track.present
                || !track.is_queued()
                || self
                    .trackers
                    .get(&track.download_key())
                    .is_none_or(|t| t.skipped)
        })
    }

    /// Skip every unsettled track, returning `(index, last transfer id)`.
    pub fn abandon_unsettled(&mut self, tracks: &[Track]) -> Vec<(usize, Option<String>)> {
        let mut abandoned = Vec::new();
        for (index, track) in tracks.iter().enumerate() {
            if track.present || !track.is_queued() {
                continue;
            }
            let tracker = self
                .trackers
                .entry(track.download_key())
                .or_insert_with(|| DownloadTracker::new(Instant::now()));
            if !tracker.skipped {
                tracker.skipped = true;
                abandoned.push((index, tracker.transfer_id.clone()));
            }
        }
        abandoned
    }
}

/// Find the transfer for a track's queued download.
fn find_file<'a>(status: &'a [UserTransfers], track: &Track) -> Option<&'a Transfer> {
    let owner = track.owner.as_deref()?;
    let file = track.file.as_deref()?;

    status
        .iter()
        .filter(|user| user.username == owner)
        .flat_map(|user| user.directories.iter())
        .flat_map(|dir| dir.files.iter())
        .find(|transfer| transfer.filename == file)
}

impl Slskd {
    /// Follow every queued download in `tracks` until each one is present
    /// or skipped. Returns the number of tracks downloaded.
    ///
    /// Polls the transfer list once per poll interval. A failed poll is
    /// logged and retried on the next tick.
    pub fn monitor_downloads(&self, tracks: &mut [Track]) -> usize {
        let timings = self.cfg.timings;
        let queued = tracks.iter().filter(|t| !t.present && t.is_queued()).count();
        if queued == 0 {
            output::detail("no downloads to monitor");
            return 0;
        }

        let mut store = ProgressStore::new();
        let mut downloaded = 0;
        let started = Instant::now();

        output::heading(&format!("Monitoring {} downloads", queued));

        loop {
            thread::sleep(timings.poll_interval);

            match self.download_status() {
                Ok(status) => {
                    let events = store.observe(tracks, &status, Instant::now(), timings.stale_after);
                    for event in events {
                        if self.handle_event(event, tracks) {
                            downloaded += 1;
                        }
                    }

                    if store.all_settled(tracks) {
                        output::success(&format!(
                            "{} out of {} tracks have been downloaded",
                            downloaded, queued
                        ));
                        return downloaded;
                    }
                }
                Err(e) => output::error(&format!("error fetching download status: {}", e)),
            }

            if let Some(deadline) = self.cfg.monitor_deadline {
                if started.elapsed() >= deadline {
                    for (index, transfer_id) in store.abandon_unsettled(tracks) {
                        let track = &tracks[index];
                        output::warning(&format!(
                            "monitor deadline reached, skipping {}",
                            track.details()
                        ));
                        self.cleanup_track(track, transfer_id.as_deref());
                    }
                    output::warning(&format!(
                        "{} out of {} tracks have been downloaded",
                        downloaded, queued
                    ));
                    return downloaded;
                }
            }
        }
    }

    /// Returns true when the event is a completed download.
    fn handle_event(&self, event: MonitorEvent, tracks: &mut [Track]) -> bool {
        match event {
            MonitorEvent::Progress {
                index,
                bytes_transferred,
            } => {
                output::detail(&format!(
                    "progress updated for {}: {} bytes transferred",
                    tracks[index].file.as_deref().unwrap_or_default(),
                    bytes_transferred
                ));
                false
            }
            MonitorEvent::Completed { index, transfer_id } => {
                let track = &mut tracks[index];
                let remote = track.file.clone().unwrap_or_default();
                let (file, parent) = parse_path(&remote);
                output::success(&format!("{} downloaded successfully", file));

                if self.cfg.migrate_downloads {
                    match move_download(&self.cfg.slskd_dir, &self.download_dir, &parent, &file) {
                        Ok(dest) => output::debug(&format!("track moved to {}", dest.display())),
                        Err(e) => output::debug(&format!("failed to move track: {}", e)),
                    }
                }

                self.cleanup_track(track, Some(transfer_id.as_str()));
                track.file = Some(file);
                true
            }
            MonitorEvent::Failed {
                index,
                transfer_id,
                state,
            } => {
                let track = &tracks[index];
                output::warning(&format!("{} ended as '{}', skipping track", track.details(), state));
                self.cleanup_track(track, Some(transfer_id.as_str()));
                false
            }
            MonitorEvent::Stalled { index, transfer_id } => {
                let track = &tracks[index];
                output::warning(&format!(
                    "no progress on {} in {:?}, skipping track",
                    track.file.as_deref().unwrap_or_default(),
                    self.cfg.timings.stale_after
                ));
                self.cleanup_track(track, Some(transfer_id.as_str()));
                false
            }
            MonitorEvent::NotFound { index } => {
                let track = &tracks[index];
                output::warning(&format!(
                    "{} by {} not found in queue after retries, skipping track",
                    track.clean_title, track.main_artist
                ));
                false
            }
        }
    }

    fn download_status(&self) -> Result<Vec<UserTransfers>> {
        self.client.get_json(DOWNLOADS)
    }

    /// Delete the track's search and remove its transfer. Failures are
    /// logged only.
    pub(crate) fn cleanup_track(&self, track: &Track, transfer_id: Option<&str>) {
        if let Some(id) = track.search_id.as_deref() {
            self.delete_search_logged(id);
        }
        if let (Some(owner), Some(id)) = (track.owner.as_deref(), transfer_id) {
            self.delete_download(owner, id);
        }
    }

    /// Cancel the transfer, then remove it from the transfer list.
    fn delete_download(&self, owner: &str, id: &str) {
        let endpoint = format!("{}/{}/{}", DOWNLOADS, urlencoding::encode(owner), id);

        if let Err(e) = self.client.delete(&format!("{}?remove=false", endpoint)) {
            output::debug(&format!("soft delete failed: {}", e));
        }
        thread::sleep(self.cfg.timings.delete_pause);
        if let Err(e) = self.client.delete(&format!("{}?remove=true", endpoint)) {
            output::debug(&format!("hard delete failed: {}", e));
        }
    }
}
