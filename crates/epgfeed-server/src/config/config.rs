//! `AppConfig` struct and TOML loading.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Default, PartialEq, Eq)]
pub struct AppConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Feed generation settings.
    #[serde(default)]
    pub feed: FeedConfig,
    /// Upstream response cache settings.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Upstream client settings.
    #[serde(default)]
    pub upstream: UpstreamConfig,
}

/// HTTP server configuration.
#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to listen on.
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: String::from("0.0.0.0:8080"),
        }
    }
}

/// Feed generation configuration.
#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FeedConfig {
    /// Directory holding the published feed, the lease file and the response
    /// cache. Relative paths resolve against `--dir` when given.
    pub data_dir: PathBuf,
    /// Feed age in hours beyond which a request triggers regeneration.
    pub staleness_hours: i64,
    /// Regeneration lease lifetime in minutes.
    pub lock_ttl_minutes: i64,
    /// Whether to remap channel ids to the A1 numbering scheme.
    pub map_channel_ids_to_a1: bool,
    /// Custom A1 remap table; the bundled table is used when absent.
    pub a1_channel_map: Option<PathBuf>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            staleness_hours: 12,
            lock_ttl_minutes: 60,
            map_channel_ids_to_a1: false,
            a1_channel_map: None,
        }
    }
}

/// Upstream response cache configuration.
#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache entry TTL in hours.
    pub ttl_hours: i64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_hours: 48 }
    }
}

/// Upstream client configuration.
#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Upper bound on concurrent upstream fetches.
    pub fetch_concurrency: usize,
    /// Landing page URL override.
    pub landing_url: Option<String>,
    /// API base URL override. Must end with a trailing slash.
    pub api_base_url: Option<String>,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            fetch_concurrency: 4,
            landing_url: None,
            api_base_url: None,
        }
    }
}

impl AppConfig {
    /// Loads config from a TOML file. Returns default if file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
    }
}
