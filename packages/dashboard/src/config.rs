//! Dashboard configuration.
//!
//! Resolved in three layers: built-in defaults, an optional TOML file,
//! then `AMANAI_*` environment variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use amanai_gateway::config::DEFAULT_API_BASE_URL;
use amanai_gateway::{Endpoints, GatewayConfig};
use amanai_incident_models::LayerKind;
use amanai_render::TableOrder;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Config file picked up from the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "amanai.toml";

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        /// File that was read.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The config file is not valid TOML for [`DashboardConfig`].
    #[error("Failed to parse {}: {source}", path.display())]
    Toml {
        /// File that was parsed.
        path: PathBuf,
        /// Underlying error.
        source: toml::de::Error,
    },

    /// An environment override has an unusable value.
    #[error("Invalid value for {name}: {value:?}")]
    Env {
        /// Variable name.
        name: &'static str,
        /// Offending value.
        value: String,
    },
}

/// Runtime settings for the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Backend base URL.
    pub api_base_url: String,
    /// Per-request timeout; absent means no timeout.
    pub request_timeout_secs: Option<u64>,
    /// Periodic refresh interval; absent disables periodic refresh.
    pub refresh_interval_secs: Option<u64>,
    /// Layers shown right after the initial load.
    pub initial_layers: Vec<LayerKind>,
    /// Incident table ordering.
    pub table_order: TableOrder,
    /// Where exported reports are written.
    pub export_dir: PathBuf,
    /// Backend endpoint paths.
    pub endpoints: Endpoints,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_secs: None,
            refresh_interval_secs: None,
            initial_layers: Vec::new(),
            table_order: TableOrder::default(),
            export_dir: PathBuf::from("."),
            endpoints: Endpoints::default(),
        }
    }
}

impl DashboardConfig {
    /// Loads configuration from `path`, or from [`DEFAULT_CONFIG_FILE`] if
    /// it exists, then applies environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if an explicitly given file is missing, a
    /// file fails to parse, or an environment override is invalid.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Parses a TOML config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&text).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Applies `AMANAI_API_URL`, `AMANAI_TIMEOUT_SECS` and
    /// `AMANAI_REFRESH_SECS` as looked up through `var`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Env`] if a numeric override does not parse.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(url) = var("AMANAI_API_URL").filter(|v| !v.trim().is_empty()) {
            self.api_base_url = url;
        }
        if let Some(secs) = parse_secs(&var, "AMANAI_TIMEOUT_SECS")? {
            self.request_timeout_secs = Some(secs);
        }
        if let Some(secs) = parse_secs(&var, "AMANAI_REFRESH_SECS")? {
            self.refresh_interval_secs = Some(secs);
        }
        Ok(())
    }

    /// Gateway settings derived from this configuration.
    #[must_use]
    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            timeout: self.request_timeout_secs.map(Duration::from_secs),
            endpoints: self.endpoints.clone(),
            ..GatewayConfig::new(&self.api_base_url)
        }
    }

    /// Periodic refresh interval, if enabled. Zero disables it.
    #[must_use]
    pub fn refresh_interval(&self) -> Option<Duration> {
        self.refresh_interval_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

fn parse_secs(
    var: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<u64>, ConfigError> {
    var(name)
        .map(|value| {
            value
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::Env { name, value })
        })
        .transpose()
}
