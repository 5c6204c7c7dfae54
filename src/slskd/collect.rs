//! Candidate collection and filtering
//!
//! Collection keeps files that look like the track (extension allowed,
//! duration within tolerance, name mentions artist or album and title).
//! Filtering then orders the survivors by extension preference and applies
//! the quality floor.

use super::types::{Candidate, SearchFile, SearchResponse};
use crate::config::{FilterPolicy, normalize_extension};
use crate::error::{AcquireError, Result};
use crate::track::Track;
use std::path::Path;

/// Max difference between track and file length, in seconds
const MAX_LENGTH_DIFF_SECS: i64 = 10;

/// Words ignored when matching names
const FILLER_WORDS: &[&str] = &["the", "a", "and", "feat", "ft", "featuring"];

/// Collect every file across `responses` that matches `track`.
pub fn collect_files(track: &Track, responses: &[SearchResponse], policy: &FilterPolicy) -> Result<Vec<Candidate>> {
    let artist = sanitize_name(&track.main_artist);
    let album = sanitize_name(&track.album);
    let title = sanitize_name(&track.clean_title);

    let files: Vec<Candidate> = responses
        .iter()
        .filter(|r| r.file_count > 0 && r.has_free_upload_slot)
        .flat_map(|r| r.files.iter().map(move |f| (r.username.as_str(), f)))
        .filter_map(|(username, file)| {
            let extension = file_extension(file);
            if !policy.extensions.contains(&extension) {
                return None;
            }
            if !length_matches(track.duration, file.length) {
                return None;
            }

            let name = FileName::new(&file.filename);
            let by_artist = name.mentions(&artist) || name.mentions(&album);
            if !(by_artist && name.mentions(&title)) {
                return None;
            }

            Some(Candidate {
                filename: file.filename.clone(),
                extension,
                bit_depth: file.bit_depth,
                bit_rate: file.bit_rate,
                length: file.length,
                size: file.size,
                username: username.to_string(),
            })
        })
        .collect();

    if files.is_empty() {
        return Err(AcquireError::NoCandidates(format!(
            "{} - {}",
            track.main_artist, track.clean_title
        )));
    }
    Ok(files)
}

/// Order candidates by extension preference and drop low-quality files,
/// keeping at most `policy.download_attempts`.
pub fn filter_files(files: Vec<Candidate>, policy: &FilterPolicy) -> Result<Vec<Candidate>> {
    let mut filtered = Vec::new();

    'outer: for ext in &policy.extensions {
        for file in files.iter().filter(|f| &f.extension == ext) {
            if below_floor(file.bit_rate, policy.min_bit_rate) {
                continue;
            }
            if below_floor(file.bit_depth, policy.min_bit_depth) {
                continue;
            }

            filtered.push(file.clone());
            if filtered.len() >= policy.download_attempts {
                break 'outer;
            }
        }
    }

    if filtered.is_empty() {
        return Err(AcquireError::NoFilterMatch);
    }
    Ok(filtered)
}

/// Lowercase and replace punctuation with single spaces.
fn plain_words(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn strip_fillers(words: &str) -> String {
    words
        .split_whitespace()
        .filter(|w| !FILLER_WORDS.contains(w))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Lowercase, replace punctuation with spaces and drop filler words.
///
/// `"The Band - Song (feat. X).flac"` -> `"band song x flac"`
///
/// Names made only of filler words (`"The The"`) keep them.
pub fn sanitize_name(name: &str) -> String {
    let plain = plain_words(name);
    let stripped = strip_fillers(&plain);
    if stripped.is_empty() { plain } else { stripped }
}

/// Remote filename in both sanitized forms, so a needle that kept its
/// filler words can still be found.
struct FileName {
    plain: String,
    stripped: String,
}

impl FileName {
    fn new(filename: &str) -> Self {
        let plain = plain_words(filename);
        let stripped = strip_fillers(&plain);
        Self { plain, stripped }
    }

    fn mentions(&self, needle: &str) -> bool {
        contains(&self.stripped, needle) || contains(&self.plain, needle)
    }
}

/// Empty needles never match, so a missing album cannot satisfy the check.
fn contains(haystack: &str, needle: &str) -> bool {
    !needle.is_empty() && haystack.contains(needle)
}

/// Unknown quality (unset or zero) passes; known quality must beat the floor.
fn below_floor(value: Option<u32>, min: u32) -> bool {
    value.filter(|v| *v > 0).is_some_and(|v| v <= min)
}

fn length_matches(track_ms: i64, file_secs: Option<i64>) -> bool {
    if track_ms <= 0 {
        return true;
    }
    (track_ms / 1000 - file_secs.unwrap_or(0)).abs() <= MAX_LENGTH_DIFF_SECS
}

fn file_extension(file: &SearchFile) -> String {
    let ext = normalize_extension(&file.extension);
    if !ext.is_empty() {
        return ext;
    }

    let name = file.filename.replace('\\', "/");
    Path::new(&name)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect()
}
