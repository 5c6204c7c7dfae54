//! Track acquisition through an slskd daemon
//!
//! Drives the slskd REST API through four stages for each track:
//!
//! 1. **search** - open a search for `"<clean title> - <artist>"` and poll it
//!    until it completes ([`Slskd::query_track`])
//! 2. **collect and filter** - keep files whose name, extension and length
//!    match the track, ordered by extension preference and quality floor
//! 3. **queue** - enqueue candidates in order until the daemon accepts one
//!    ([`Slskd::get_track`])
//! 4. **monitor** - poll the transfer list for the whole batch until every
//!    download succeeded, stalled or vanished ([`Slskd::monitor_downloads`])
//!
//! [`Downloader::start_download`] runs the stages for a batch.
//!
//! # Example
//!
//! ```no_run
//! use slskd_acquire::{config, Downloader, JsonTrackSource, TrackSource};
//!
//! let cfg = config::load(None)?;
//! let mut tracks = JsonTrackSource::new("tracks.json").discover()?;
//! let report = Downloader::new(&cfg).start_download(&mut tracks);
//! println!("{} downloaded", report.downloaded);
//! # Ok::<(), slskd_acquire::AcquireError>(())
//! ```

pub mod config;
mod downloader;
pub mod error;
pub mod http;
pub mod output;
pub mod slskd;
mod track;

pub use config::{Config, FilterPolicy, SlskdConfig, Timings};
pub use downloader::{BatchReport, Downloader};
pub use error::{AcquireError, Result};
pub use http::HttpClient;
pub use slskd::Slskd;
pub use track::{JsonTrackSource, Track, TrackSource};
