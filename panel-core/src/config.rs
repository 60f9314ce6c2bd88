use anyhow::{Context, Result, anyhow, bail};
use chrono_tz::Tz;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};

use crate::{
    model::LocationCoords,
    provider::nominatim::DEFAULT_NOMINATIM_URL,
    view::{DEFAULT_MAP_URL_TEMPLATE, MapTemplate, RenderOptions},
};

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3001";
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_CACHE_KEY: &str = "panel.last_payload";
pub const DEFAULT_SERVER_TIMEZONE: &str = "Europe/London";

/// Permission grant and fixed coordinates for the location capability.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    pub enabled: bool,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl LocationConfig {
    /// Configured coordinates, if both halves are present.
    pub fn coords(&self) -> Result<Option<LocationCoords>> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => Ok(Some(LocationCoords::new(lat, lng)?)),
            (None, None) => Ok(None),
            _ => bail!("Both location.latitude and location.longitude must be set, or neither."),
        }
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// api_base_url = "http://localhost:3001"
/// poll_interval_secs = 30
///
/// [location]
/// enabled = true
/// latitude = 51.5074
/// longitude = -0.1278
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub poll_interval_secs: u64,
    pub geocoder_base_url: String,
    /// Identifies this application to the geocoder.
    pub user_agent: String,
    pub map_url_template: String,
    pub server_timezone: String,
    pub cache_key: String,
    pub location: LocationConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            geocoder_base_url: DEFAULT_NOMINATIM_URL.to_string(),
            user_agent: format!("panel/{}", env!("CARGO_PKG_VERSION")),
            map_url_template: DEFAULT_MAP_URL_TEMPLATE.to_string(),
            server_timezone: DEFAULT_SERVER_TIMEZONE.to_string(),
            cache_key: DEFAULT_CACHE_KEY.to_string(),
            location: LocationConfig::default(),
        }
    }
}

impl Config {
    pub fn poll_interval(&self) -> Result<Duration> {
        if self.poll_interval_secs == 0 {
            bail!("poll_interval_secs must be greater than zero");
        }
        Ok(Duration::from_secs(self.poll_interval_secs))
    }

    pub fn server_timezone(&self) -> Result<Tz> {
        self.server_timezone
            .parse::<Tz>()
            .map_err(|e| anyhow!("Invalid server_timezone '{}': {}", self.server_timezone, e))
    }

    pub fn map_template(&self) -> Result<MapTemplate> {
        MapTemplate::new(self.map_url_template.clone())
    }

    pub fn render_options(&self) -> Result<RenderOptions> {
        Ok(RenderOptions { server_timezone: self.server_timezone()?, map: self.map_template()? })
    }

    /// Checks every derived value at once so a bad file fails on load, not mid-run.
    pub fn validate(&self) -> Result<()> {
        if self.api_base_url.trim().is_empty() {
            bail!("api_base_url must not be empty");
        }
        if self.cache_key.trim().is_empty() {
            bail!("cache_key must not be empty");
        }
        self.poll_interval()?;
        self.render_options()?;
        self.location.coords()?;
        Ok(())
    }

    /// Grant location permission with fixed coordinates.
    pub fn set_location(&mut self, coords: LocationCoords) {
        self.location = LocationConfig {
            enabled: true,
            latitude: Some(coords.lat),
            longitude: Some(coords.lng),
        };
    }

    /// Load config from disk, or return defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            // First run: no config file, return defaults.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg = Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let cfg: Config = toml::from_str(contents)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("dev", "status-panel", "panel")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.toml"))
    }

    /// Path to the durable key-value store holding the cached payload.
    pub fn store_file_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.data_dir().join("store.json"))
    }
}
