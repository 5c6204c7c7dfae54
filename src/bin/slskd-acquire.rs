//! slskd-acquire - download a list of tracks through slskd
//!
//! Usage:
//!   slskd-acquire <tracks.json>                 Acquire the listed tracks
//!   slskd-acquire --config cfg.toml <tracks>    Use an explicit config file
//!   slskd-acquire --output done.json <tracks>   Write acquired tracks as JSON

use anyhow::{Context, Result, bail};
use clap::Parser;
use slskd_acquire::{Downloader, JsonTrackSource, TrackSource, config, output};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "slskd-acquire")]
#[command(about = "Acquire audio tracks through an slskd daemon")]
#[command(version)]
struct Cli {
    /// JSON file with the tracks to acquire
    tracks: PathBuf,

    /// Config file (defaults to $XDG_CONFIG_HOME/slskd-acquire/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the acquired tracks to this file as JSON
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Move completed downloads into the download directory
    #[arg(long)]
    migrate: bool,

    /// Print debug output (the DEBUG env var is read with the rest of the config)
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut cfg = config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if cli.migrate {
        cfg.slskd.migrate_downloads = true;
    }
    output::set_debug(cli.debug || cfg.debug);

    let mut tracks = JsonTrackSource::new(&cli.tracks)
        .discover()
        .with_context(|| format!("Failed to read tracks from {}", cli.tracks.display()))?;

    let report = Downloader::new(&cfg).start_download(&mut tracks);
    output::heading(&format!(
        "{} requested, {} already present, {} queued, {} downloaded, {} failed",
        report.requested, report.already_present, report.queued, report.downloaded, report.failed
    ));

    if let Some(path) = &cli.output {
        let json = serde_json::to_string_pretty(&tracks)?;
        std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    }

    if tracks.is_empty() {
        bail!("couldn't download any tracks");
    }
    Ok(())
}
