//! `trend.toml` loading and data directory resolution.

use std::path::{Path, PathBuf};
use std::{env, fs};

use anyhow::{Context, Result};
use serde::Deserialize;
use trend_core::TrackerConfig;

pub const CONFIG_FILE: &str = "trend.toml";
pub const DB_FILE: &str = "trend.db";
pub const PID_FILE: &str = "trend-feed.pid";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub tracker: TrackerConfig,
    pub feed: FeedConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Seconds between periodic snapshot flushes
    pub flush_interval_secs: u64,
    /// Bounded channel depth between the stdin reader and the consumer
    pub queue_depth: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            flush_interval_secs: 30,
            queue_depth: 1024,
        }
    }
}

impl AppConfig {
    /// Load from `explicit`, else `<data_dir>/trend.toml`, else defaults.
    /// An explicit path that does not exist is an error.
    pub fn load(explicit: Option<&Path>, data_dir: &Path) -> Result<Self> {
        let path = match explicit {
            Some(p) => p.to_path_buf(),
            None => {
                let p = data_dir.join(CONFIG_FILE);
                if !p.exists() {
                    tracing::debug!("no config at {}, using defaults", p.display());
                    return Ok(Self::default());
                }
                p
            }
        };

        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config = Self::parse(&content)
            .with_context(|| format!("invalid config {}", path.display()))?;
        tracing::info!("loaded config from {}", path.display());
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.tracker.validate()?;
        if config.feed.queue_depth == 0 {
            anyhow::bail!("feed.queue_depth must be at least 1");
        }
        if config.feed.flush_interval_secs == 0 {
            anyhow::bail!("feed.flush_interval_secs must be at least 1");
        }
        Ok(config)
    }
}

/// Data directory: `TREND_DATA_DIR`, else `~/.trend-tracker`.
pub fn data_dir() -> PathBuf {
    env::var("TREND_DATA_DIR")
        .ok()
        .map(PathBuf::from)
        .unwrap_or_else(default_base_dir)
}

fn default_base_dir() -> PathBuf {
    env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".trend-tracker")
}
