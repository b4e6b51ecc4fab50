//! Runtime configuration, read from an optional JSON file.

use crate::error::ConfigError;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings shared by the CLI and the refresh pipeline. Every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Street-sweeping schedule feed endpoint
    pub schedule_feed_url: String,
    /// Parking-regulation feed endpoint
    pub regulation_feed_url: String,
    /// Optional portal app token, sent as `X-App-Token`
    pub app_token: Option<String>,
    /// Rows requested per page
    pub page_size: usize,
    /// Maximum distance for joining a regulation to a sweeping schedule
    pub match_threshold_meters: f64,
    /// Radius for attributing a GPS fix to a watched spot
    pub spot_threshold_meters: f64,
    /// IANA timezone the feeds' wall-clock times are in
    pub timezone: String,
    /// Where the matched snapshot is persisted
    pub snapshot_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schedule_feed_url: "https://data.sfgov.org/resource/yhqp-riqs.json".to_string(),
            regulation_feed_url: "https://data.sfgov.org/resource/hi6h-neyh.json".to_string(),
            app_token: None,
            page_size: 1000,
            match_threshold_meters: 15.0,
            spot_threshold_meters: crate::spot::DEFAULT_SPOT_THRESHOLD_METERS,
            timezone: "America/Los_Angeles".to_string(),
            snapshot_path: PathBuf::from("sweepsafe.bin"),
        }
    }
}

impl Config {
    /// Reads `path` when given, otherwise returns the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&text)?;
        config.tz()?;
        log::debug!("loaded config from {}", path.display());
        Ok(config)
    }

    /// The configured timezone.
    pub fn tz(&self) -> Result<Tz, ConfigError> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| ConfigError::UnknownTimezone(self.timezone.clone()))
    }
}
