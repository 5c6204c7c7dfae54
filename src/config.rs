//! Run configuration
//!
//! Settings are layered: an optional TOML file, then environment variables
//! using the deployment names (`SLSKD_URL`, `SLSKD_API_KEY`, ...). Later
//! layers override earlier ones key by key. `resolve` fills in defaults and
//! validates the result.
//!
//! ```toml
//! download_dir = "/data/"
//!
//! [slskd]
//! url = "http://localhost:5030"
//! api_key = "..."
//! retry = 5
//! download_attempts = 3
//! dir = "/slskd/"
//! migrate_downloads = false
//! timeout_secs = 20
//!
//! [filters]
//! extensions = ["flac", "mp3"]
//! min_bit_depth = 8
//! min_bitrate = 256
//! ```

use crate::error::{AcquireError, Result};
use crate::http::DEFAULT_HTTP_TIMEOUT_SECS;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_RETRY: u32 = 5;
const DEFAULT_DOWNLOAD_ATTEMPTS: usize = 3;
const DEFAULT_SLSKD_DIR: &str = "/slskd/";
const DEFAULT_DOWNLOAD_DIR: &str = "/data/";
const DEFAULT_EXTENSIONS: &[&str] = &["flac", "mp3"];
const DEFAULT_MIN_BIT_DEPTH: u32 = 8;
const DEFAULT_MIN_BITRATE: u32 = 256;

/// Candidate filter policy
#[derive(Debug, Clone, PartialEq)]
pub struct FilterPolicy {
    /// Allowed extensions, most preferred first
    pub extensions: Vec<String>,
    pub min_bit_depth: u32,
    pub min_bit_rate: u32,
    /// Max number of files to try queueing per track
    pub download_attempts: usize,
}

impl Default for FilterPolicy {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            min_bit_depth: DEFAULT_MIN_BIT_DEPTH,
            min_bit_rate: DEFAULT_MIN_BITRATE,
            download_attempts: DEFAULT_DOWNLOAD_ATTEMPTS,
        }
    }
}

/// Fixed delays of the acquisition state machine
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timings {
    /// Pause between search status checks
    pub search_retry_delay: Duration,
    /// Interval between download status polls
    pub poll_interval: Duration,
    /// A download with no byte progress for this long is abandoned
    pub stale_after: Duration,
    /// Pause between soft and hard delete of a transfer
    pub delete_pause: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            search_retry_delay: Duration::from_secs(20),
            poll_interval: Duration::from_secs(60),
            stale_after: Duration::from_secs(15 * 60),
            delete_pause: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SlskdConfig {
    pub url: String,
    pub api_key: Option<String>,
    /// Search status checks before giving up on a search
    pub retry: u32,
    /// Directory slskd writes completed downloads into
    pub slskd_dir: PathBuf,
    /// Move completed downloads from `slskd_dir` to the download dir
    pub migrate_downloads: bool,
    pub timeout: Duration,
    /// Overall limit for the monitor loop; `None` waits until every track settles
    pub monitor_deadline: Option<Duration>,
    pub filters: FilterPolicy,
    pub timings: Timings,
}

impl SlskdConfig {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            api_key: None,
            retry: DEFAULT_RETRY,
            slskd_dir: PathBuf::from(DEFAULT_SLSKD_DIR),
            migrate_downloads: false,
            timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            monitor_deadline: None,
            filters: FilterPolicy::default(),
            timings: Timings::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub slskd: SlskdConfig,
    pub download_dir: PathBuf,
    pub debug: bool,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigToml {
    download_dir: Option<PathBuf>,
    debug: Option<bool>,
    slskd: Option<SlskdToml>,
    filters: Option<FiltersToml>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct SlskdToml {
    url: Option<String>,
    api_key: Option<String>,
    retry: Option<u32>,
    download_attempts: Option<usize>,
    dir: Option<PathBuf>,
    migrate_downloads: Option<bool>,
    timeout_secs: Option<u64>,
    monitor_deadline_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct FiltersToml {
    extensions: Option<Vec<String>>,
    min_bit_depth: Option<u32>,
    min_bitrate: Option<u32>,
}

impl ConfigToml {
    pub fn merge(&mut self, other: ConfigToml) {
        if other.download_dir.is_some() {
            self.download_dir = other.download_dir;
        }
        if other.debug.is_some() {
            self.debug = other.debug;
        }
        match (self.slskd.as_mut(), other.slskd) {
            (Some(dst), Some(src)) => dst.merge(src),
            (None, Some(src)) => self.slskd = Some(src),
            _ => {}
        }
        match (self.filters.as_mut(), other.filters) {
            (Some(dst), Some(src)) => dst.merge(src),
            (None, Some(src)) => self.filters = Some(src),
            _ => {}
        }
    }

    /// Build a layer from environment variables looked up through `lookup`.
    pub fn from_env(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let slskd = SlskdToml {
            url: get("SLSKD_URL"),
            api_key: get("SLSKD_API_KEY"),
            retry: parse_var("SLSKD_RETRY", get("SLSKD_RETRY"))?,
            download_attempts: parse_var("SLSKD_DL_ATTEMPTS", get("SLSKD_DL_ATTEMPTS"))?,
            dir: get("SLSKD_DIR").map(PathBuf::from),
            migrate_downloads: parse_flag("MIGRATE_DOWNLOADS", get("MIGRATE_DOWNLOADS"))?,
            timeout_secs: parse_var("SLSKD_TIMEOUT", get("SLSKD_TIMEOUT").map(strip_secs))?,
            monitor_deadline_secs: parse_var(
                "MONITOR_DEADLINE",
                get("MONITOR_DEADLINE").map(strip_secs),
            )?,
        };
        let filters = FiltersToml {
            extensions: get("EXTENSIONS").map(|v| v.split(',').map(str::to_string).collect()),
            min_bit_depth: parse_var("MIN_BIT_DEPTH", get("MIN_BIT_DEPTH"))?,
            min_bitrate: parse_var("MIN_BITRATE", get("MIN_BITRATE"))?,
        };

        Ok(Self {
            download_dir: get("DOWNLOAD_DIR").map(PathBuf::from),
            debug: parse_flag("DEBUG", get("DEBUG"))?,
            slskd: Some(slskd),
            filters: Some(filters),
        })
    }

    pub fn resolve(self) -> Result<Config> {
        let slskd = self.slskd.unwrap_or_default();
        let filters = self.filters.unwrap_or_default();

        let url = slskd
            .url
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| AcquireError::Config("SLSKD_URL is not set".to_string()))?;

        let extensions: Vec<String> = filters
            .extensions
            .unwrap_or_else(|| DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect())
            .iter()
            .map(|e| normalize_extension(e))
            .filter(|e| !e.is_empty())
            .collect();
        if extensions.is_empty() {
            return Err(AcquireError::Config("no allowed extensions configured".to_string()));
        }

        let download_attempts = slskd.download_attempts.unwrap_or(DEFAULT_DOWNLOAD_ATTEMPTS);
        if download_attempts == 0 {
            return Err(AcquireError::Config("SLSKD_DL_ATTEMPTS must be >= 1".to_string()));
        }

        Ok(Config {
            slskd: SlskdConfig {
                url,
                api_key: slskd.api_key,
                retry: slskd.retry.unwrap_or(DEFAULT_RETRY),
                slskd_dir: slskd.dir.unwrap_or_else(|| PathBuf::from(DEFAULT_SLSKD_DIR)),
                migrate_downloads: slskd.migrate_downloads.unwrap_or(false),
                timeout: Duration::from_secs(slskd.timeout_secs.unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS).max(1)),
                monitor_deadline: slskd
                    .monitor_deadline_secs
                    .filter(|s| *s > 0)
                    .map(Duration::from_secs),
                filters: FilterPolicy {
                    extensions,
                    min_bit_depth: filters.min_bit_depth.unwrap_or(DEFAULT_MIN_BIT_DEPTH),
                    min_bit_rate: filters.min_bitrate.unwrap_or(DEFAULT_MIN_BITRATE),
                    download_attempts,
                },
                timings: Timings::default(),
            },
            download_dir: self
                .download_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DOWNLOAD_DIR)),
            debug: self.debug.unwrap_or(false),
        })
    }
}

impl SlskdToml {
    fn merge(&mut self, other: SlskdToml) {
        if other.url.is_some() {
            self.url = other.url;
        }
        if other.api_key.is_some() {
            self.api_key = other.api_key;
        }
        if other.retry.is_some() {
            self.retry = other.retry;
        }
        if other.download_attempts.is_some() {
            self.download_attempts = other.download_attempts;
        }
        if other.dir.is_some() {
            self.dir = other.dir;
        }
        if other.migrate_downloads.is_some() {
            self.migrate_downloads = other.migrate_downloads;
        }
        if other.timeout_secs.is_some() {
            self.timeout_secs = other.timeout_secs;
        }
        if other.monitor_deadline_secs.is_some() {
            self.monitor_deadline_secs = other.monitor_deadline_secs;
        }
    }
}

impl FiltersToml {
    fn merge(&mut self, other: FiltersToml) {
        if other.extensions.is_some() {
            self.extensions = other.extensions;
        }
        if other.min_bit_depth.is_some() {
            self.min_bit_depth = other.min_bit_depth;
        }
        if other.min_bitrate.is_some() {
            self.min_bitrate = other.min_bitrate;
        }
    }
}

fn parse_var<T: FromStr>(key: &str, raw: Option<String>) -> Result<Option<T>> {
    raw.map(|v| {
        v.trim()
            .to_ascii_lowercase()
            .parse::<T>()
            .map_err(|_| AcquireError::Config(format!("{key}: cannot parse '{v}'")))
    })
    .transpose()
}

fn parse_flag(key: &str, raw: Option<String>) -> Result<Option<bool>> {
    raw.map(|v| match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(AcquireError::Config(format!("{key}: cannot parse '{v}'"))),
    })
    .transpose()
}

/// Accept both `20` and `20s`
fn strip_secs(v: String) -> String {
    v.trim().trim_end_matches('s').to_string()
}

/// Lowercase and strip a leading dot: `.FLAC` -> `flac`
pub fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim().to_lowercase();
    ext.strip_prefix('.').unwrap_or(&ext).to_string()
}

fn xdg_config_home() -> PathBuf {
    if let Ok(raw) = std::env::var("XDG_CONFIG_HOME") {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed);
        }
    }
    dirs::config_dir().unwrap_or_else(|| PathBuf::from(".").join(".config"))
}

pub fn default_config_path() -> PathBuf {
    xdg_config_home().join("slskd-acquire").join("config.toml")
}

pub fn read_toml(path: &Path) -> Result<ConfigToml> {
    let text = std::fs::read_to_string(path).map_err(|source| AcquireError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str::<ConfigToml>(&text)
        .map_err(|e| AcquireError::Config(format!("invalid TOML in {}: {e}", path.display())))
}

/// Load configuration from the given file (or the default path, if it
/// exists) overlaid with the process environment.
pub fn load(path: Option<&Path>) -> Result<Config> {
    let mut merged = ConfigToml::default();

    match path {
        Some(p) => merged.merge(read_toml(p)?),
        None => {
            let default = default_config_path();
            if default.exists() {
                merged.merge(read_toml(&default)?);
            }
        }
    }

    merged.merge(ConfigToml::from_env(|k| std::env::var(k).ok())?);
    merged.resolve()
}
