//! TOML configuration for r2ping.
//!
//! Layered model: an explicit path, then the `R2PING_CONFIG` environment
//! variable, then `./r2ping.toml`, then compiled-in defaults.

mod run;

pub use self::run::{
    clamp_probe_count, parse_probe_count, RegionScope, RunConfig, RunRequest,
    DEFAULT_PROBE_COUNT, MAX_PROBE_COUNT, MIN_PROBE_COUNT,
};

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::catalog::{Catalog, Endpoint};

/// Environment variable naming a config file.
pub const CONFIG_ENV: &str = "R2PING_CONFIG";
/// Config file picked up from the working directory.
pub const LOCAL_CONFIG_FILE: &str = "r2ping.toml";

/// Setup-time errors. Any of these aborts a run before a single probe is sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid test scenario '{0}' (expected dev, custom-no-cache or custom-cache)")]
    InvalidScenario(String),

    #[error("region '{0}' not found in catalog")]
    RegionNotFound(String),

    #[error("endpoint catalog is empty")]
    EmptyCatalog,

    #[error("region '{0}' is defined more than once")]
    DuplicateRegion(String),

    #[error("'{0}' is reserved for selecting every region and cannot be a region id")]
    ReservedRegionId(String),
}

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub probe: ProbeSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Catalog override. Empty means the built-in catalog.
    #[serde(default)]
    pub regions: Vec<Endpoint>,
}

impl AppConfig {
    /// Load configuration from a TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Resolve configuration for the CLI.
    ///
    /// An explicit path must load; the environment variable and local file
    /// fall back to defaults with a warning.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        if let Ok(env_path) = std::env::var(CONFIG_ENV) {
            let path = Path::new(&env_path);
            match Self::load(path) {
                Ok(cfg) => return Ok(cfg),
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "R2PING_CONFIG set but file could not be loaded, trying fallback"
                    );
                }
            }
        }

        let local = Path::new(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load(local) {
                Ok(cfg) => return Ok(cfg),
                Err(e) => {
                    warn!(
                        path = %local.display(),
                        error = %e,
                        "local config file exists but could not be loaded, using defaults"
                    );
                }
            }
        }

        debug!("no config file found, using compiled-in defaults");
        Ok(Self::default())
    }

    /// The endpoint catalog this configuration describes.
    pub fn catalog(&self) -> Result<Catalog, ConfigError> {
        if self.regions.is_empty() {
            Ok(Catalog::builtin())
        } else {
            Catalog::new(self.regions.clone())
        }
    }
}

// ---------------------------------------------------------------------------
// Probe
// ---------------------------------------------------------------------------

/// Probe pacing and HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeSettings {
    /// Pause between the completion of one probe and the dispatch of the next.
    pub inter_probe_delay_ms: u64,
    /// Start offset per catalog position when every region is tested.
    pub stagger_ms: u64,
    /// Request deadline. `None` leaves the transport default in place.
    pub request_timeout_secs: Option<u64>,
    pub user_agent: String,
}

impl ProbeSettings {
    pub fn inter_probe_delay(&self) -> Duration {
        Duration::from_millis(self.inter_probe_delay_ms)
    }

    pub fn stagger(&self) -> Duration {
        Duration::from_millis(self.stagger_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            inter_probe_delay_ms: 1000,
            stagger_ms: 500,
            request_timeout_secs: None,
            user_agent: concat!("r2ping/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Logging configuration. `RUST_LOG` takes precedence over `level`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Minimum tracing level (`trace`, `debug`, `info`, `warn`, `error`).
    pub level: String,
    /// Emit log lines as JSON.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
