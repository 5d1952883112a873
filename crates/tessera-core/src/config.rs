//! Configuration loading and typed config structures for a Tessera run.
//!
//! The canonical configuration lives in `tessera-config.yaml` at the project
//! root. Every field has a default, so an empty file is a valid
//! configuration: Conway's Life seeded with a 32x32 C1 soup, stepped
//! unthrottled for 1000 generations.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tessera_rules::RuleSpec;
use tessera_types::{Coord, Rect, SelectionError};

use crate::identify::DEFAULT_BUDGET;
use crate::soup::SoupSettings;

/// Environment variable naming the configuration file.
pub const CONFIG_PATH_ENV: &str = "TESSERA_CONFIG";

/// Environment variable overriding `logging.level`.
pub const LOG_LEVEL_ENV: &str = "TESSERA_LOG_LEVEL";

/// Configuration file used when [`CONFIG_PATH_ENV`] is unset.
pub const DEFAULT_CONFIG_PATH: &str = "tessera-config.yaml";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level run configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TesseraConfig {
    /// Which rule to run.
    #[serde(default)]
    pub rule: RuleSpec,

    /// Stepping limits and pacing.
    #[serde(default)]
    pub run: RunConfig,

    /// Initial pattern.
    #[serde(default)]
    pub seed: SeedConfig,

    /// Pattern identification after the run.
    #[serde(default)]
    pub identification: IdentificationConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Final export.
    #[serde(default)]
    pub output: OutputConfig,
}

impl TesseraConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// `TESSERA_LOG_LEVEL` overrides `logging.level` when set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.logging.apply_env_overrides();
        Ok(config)
    }

    /// The configuration path: `TESSERA_CONFIG` if set, otherwise
    /// [`DEFAULT_CONFIG_PATH`].
    pub fn resolve_path() -> PathBuf {
        std::env::var_os(CONFIG_PATH_ENV)
            .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from)
    }
}

/// Run boundaries and pacing.
///
/// A value of 0 for either limit means unlimited.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RunConfig {
    /// Stop once this generation has been reached (0 = unlimited).
    #[serde(default = "default_max_generations")]
    pub max_generations: u64,

    /// Stop after this many wall-clock seconds (0 = unlimited).
    #[serde(default)]
    pub max_real_time_seconds: u64,

    /// Target generations per second (0 = unthrottled).
    #[serde(default)]
    pub target_rate: f64,

    /// Publish a full snapshot every N generations.
    #[serde(default = "default_snapshot_interval")]
    pub snapshot_interval: u64,

    /// Stop as soon as the frontier is empty.
    #[serde(default = "default_true")]
    pub stop_when_quiescent: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_generations: default_max_generations(),
            max_real_time_seconds: 0,
            target_rate: 0.0,
            snapshot_interval: default_snapshot_interval(),
            stop_when_quiescent: true,
        }
    }
}

/// A rectangle given by its top-left corner and size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RegionConfig {
    /// First row.
    #[serde(default)]
    pub top: i64,
    /// First column.
    #[serde(default)]
    pub left: i64,
    /// Number of rows.
    #[serde(default = "default_region_size")]
    pub height: i64,
    /// Number of columns.
    #[serde(default = "default_region_size")]
    pub width: i64,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            top: 0,
            left: 0,
            height: default_region_size(),
            width: default_region_size(),
        }
    }
}

impl RegionConfig {
    /// The top-left corner.
    pub const fn origin(&self) -> Coord {
        Coord::new(self.top, self.left)
    }

    /// The half-open rectangle this region describes.
    ///
    /// # Errors
    ///
    /// Returns [`SelectionError::EmptyRect`] for a zero or negative size.
    pub fn to_rect(&self) -> Result<Rect, SelectionError> {
        Rect::with_size(self.origin(), self.height, self.width)
    }
}

/// Initial pattern: an RLE file if given, otherwise a soup.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SeedConfig {
    /// RLE file stamped with its top-left corner at `region.top/left`.
    #[serde(default)]
    pub rle_path: Option<PathBuf>,

    /// Soup area, or the stamp origin for RLE input.
    #[serde(default)]
    pub region: RegionConfig,

    /// Soup parameters.
    #[serde(default)]
    pub soup: SoupSettings,

    /// RNG seed for soups (unset = OS entropy).
    #[serde(default)]
    pub rng_seed: Option<u64>,
}

/// Pattern identification settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct IdentificationConfig {
    /// Whether to identify the final pattern.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Generation budget for the identifier.
    #[serde(default = "default_identification_budget")]
    pub budget: u64,
}

impl Default for IdentificationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            budget: default_identification_budget(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl LoggingConfig {
    /// Override the level with `TESSERA_LOG_LEVEL` when set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var(LOG_LEVEL_ENV) {
            self.level = val;
        }
    }
}

/// Final export settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct OutputConfig {
    /// Write the final pattern as RLE to this path.
    #[serde(default)]
    pub rle_path: Option<PathBuf>,
}

const fn default_max_generations() -> u64 {
    1000
}

const fn default_snapshot_interval() -> u64 {
    10
}

const fn default_region_size() -> i64 {
    32
}

const fn default_identification_budget() -> u64 {
    DEFAULT_BUDGET
}

fn default_log_level() -> String {
    "info".to_owned()
}

const fn default_true() -> bool {
    true
}
