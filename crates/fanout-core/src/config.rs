//! Configuration module for Fanout.
//!
//! Provides typed configuration structs that map to the YAML configuration
//! file, with loading, validation and defaults. The transport registry is
//! built from the `transports` list at startup; nothing here is global
//! mutable state.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for Fanout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub watch: WatchConfig,
    pub limits: LimitsConfig,
    pub state: StateConfig,
    pub logging: LoggingConfig,
    /// Remote destinations, in dispatch order.
    #[serde(default)]
    pub transports: Vec<TransportConfig>,
}

/// Watch root and cycle triggering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Root directory mirrored to the remote destinations.
    pub root: PathBuf,
    /// Seconds between forced reconciliation cycles.
    pub poll_interval: u64,
    /// Seconds a path must be quiet after a change before a cycle is triggered.
    pub debounce_delay: u64,
}

/// Per-file limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Files above this size (in MiB) are skipped entirely, never uploaded.
    pub max_file_size_mb: u64,
}

impl LimitsConfig {
    /// Maximum file size in bytes.
    #[must_use]
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb * 1024 * 1024
    }
}

/// State store location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateConfig {
    /// Path of the persisted tracked-entry mapping.
    pub path: PathBuf,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

/// A single configured remote destination.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransportConfig {
    /// Bearer-token HTTP object API (upload / delete / mkdir actions).
    Http {
        /// Registry name for this destination (key of stored remote refs).
        name: String,
        /// Base URL of the API endpoint.
        url: String,
        /// Bearer token.
        token: String,
    },
}

impl TransportConfig {
    /// The registry name of this destination.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            TransportConfig::Http { name, .. } => name,
        }
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/fanout/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("fanout")
            .join("config.yaml")
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            root: dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("~"))
                .join("Fanout"),
            poll_interval: 30,
            debounce_delay: 2,
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: 50,
        }
    }
}

impl Default for StateConfig {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("fanout");
        Self {
            path: data_dir.join("state.json"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"watch.poll_interval"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- watch ---
        if self.watch.poll_interval == 0 {
            errors.push(ValidationError {
                field: "watch.poll_interval".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.watch.debounce_delay == 0 {
            errors.push(ValidationError {
                field: "watch.debounce_delay".into(),
                message: "must be greater than 0".into(),
            });
        }

        // Check the watch root only when it does not start with `~`
        // (tilde is expanded at runtime).
        let root_str = self.watch.root.to_string_lossy();
        if !root_str.starts_with('~') && !self.watch.root.exists() {
            errors.push(ValidationError {
                field: "watch.root".into(),
                message: format!("directory does not exist: {}", self.watch.root.display()),
            });
        }

        // --- limits ---
        if self.limits.max_file_size_mb == 0 {
            errors.push(ValidationError {
                field: "limits.max_file_size_mb".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}', expected one of {:?}",
                    self.logging.level, VALID_LOG_LEVELS
                ),
            });
        }

        // --- transports ---
        let mut seen_names = Vec::new();
        for (idx, transport) in self.transports.iter().enumerate() {
            let name = transport.name();
            if name.is_empty() {
                errors.push(ValidationError {
                    field: format!("transports[{idx}].name"),
                    message: "must not be empty".into(),
                });
            }
            if seen_names.contains(&name) {
                errors.push(ValidationError {
                    field: format!("transports[{idx}].name"),
                    message: format!("duplicate transport name '{name}'"),
                });
            }
            seen_names.push(name);

            match transport {
                TransportConfig::Http { url, token, .. } => {
                    if !url.starts_with("http://") && !url.starts_with("https://") {
                        errors.push(ValidationError {
                            field: format!("transports[{idx}].url"),
                            message: format!("must be an http(s) URL, got '{url}'"),
                        });
                    }
                    if token.is_empty() {
                        errors.push(ValidationError {
                            field: format!("transports[{idx}].token"),
                            message: "must not be empty".into(),
                        });
                    }
                }
            }
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
