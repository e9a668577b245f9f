/// Service configuration loader - parses slope_sentry.toml
///
/// Separates deployment tuning from code, making it easy to adjust
/// thresholds, the scoring window or the alert wording for a site without
/// recompiling the service. Secrets (database URL, bot token) stay in the
/// environment.

use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::model::{ThresholdOverrides, Thresholds};
use crate::scoring::{self, ScoringConfig};

/// Default configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "slope_sentry.toml";

/// Largest `history_limit` the endpoint will honour.
pub const MAX_HISTORY_LIMIT: usize = 500;

// ---------------------------------------------------------------------------
// Configuration sections
// ---------------------------------------------------------------------------

/// HTTP endpoint settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    /// Default number of results returned by `GET /history`.
    pub history_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            history_limit: 50,
        }
    }
}

/// High-risk alert wording.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Label for the monitored slope included in every alert.
    pub location: String,
    /// Where residents are told to go.
    pub evacuation_site: String,
    /// Local time offset used when formatting the alert timestamp.
    pub utc_offset_hours: i32,
    pub timezone_label: String,
    /// Worker threads delivering alerts off the ingestion path.
    pub workers: usize,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            location: "Site A".to_string(),
            evacuation_site: "Site B".to_string(),
            utc_offset_hours: 8,
            timezone_label: "MYT".to_string(),
            workers: 2,
        }
    }
}

/// Root configuration structure for TOML parsing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct RawConfig {
    scoring: ScoringConfig,
    thresholds: ThresholdOverrides,
    server: ServerConfig,
    alert: AlertConfig,
}

/// Fully resolved service configuration.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ServiceConfig {
    pub scoring: ScoringConfig,
    pub thresholds: Thresholds,
    pub server: ServerConfig,
    pub alert: AlertConfig,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Parses configuration from TOML text. Omitted sections and keys take their
/// defaults; threshold channels left out keep the built-in limits.
pub fn parse_config(contents: &str) -> Result<ServiceConfig, ConfigError> {
    let raw: RawConfig = toml::from_str(contents)?;

    let config = ServiceConfig {
        scoring: raw.scoring,
        thresholds: raw.thresholds.apply_to(&Thresholds::default()),
        server: raw.server,
        alert: raw.alert,
    };
    config.validate()?;
    Ok(config)
}

/// Loads configuration from `path`.
///
/// A missing file is not an error: the service runs on defaults. Any other
/// read failure, a parse error or an invalid value is reported.
pub fn load_config(path: &Path) -> Result<ServiceConfig, ConfigError> {
    match fs::read_to_string(path) {
        Ok(contents) => parse_config(&contents),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::info!(path = %path.display(), "No configuration file found, using defaults");
            Ok(ServiceConfig::default())
        }
        Err(source) => Err(ConfigError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

impl ServiceConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        scoring::validate_thresholds(&self.thresholds)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        if self.scoring.min_history == 0 {
            return Err(ConfigError::Invalid("scoring.min_history must be at least 1".into()));
        }
        if self.scoring.window_size < self.scoring.min_history {
            return Err(ConfigError::Invalid(format!(
                "scoring.window_size ({}) must be at least scoring.min_history ({})",
                self.scoring.window_size, self.scoring.min_history
            )));
        }
        if self.server.history_limit == 0 || self.server.history_limit > MAX_HISTORY_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "server.history_limit must be between 1 and {}",
                MAX_HISTORY_LIMIT
            )));
        }
        if self.alert.workers == 0 {
            return Err(ConfigError::Invalid("alert.workers must be at least 1".into()));
        }
        Ok(())
    }
}
