//! Configuration loading for Amble.
//!
//! Settings resolve through four sources, strongest first:
//! 1. Environment variables
//! 2. Project config (`.amble/config.toml`)
//! 3. User config (`~/.amble/config.toml`)
//! 4. Built-in defaults
//!
//! Every setting is optional; with no config files present the built-in
//! defaults carry the whole system.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{AmbleError, Result};

/// Main configuration struct for Amble.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Data file location.
    pub storage: StorageConfig,
    /// Coach alert dispatch configuration.
    pub alerts: AlertsConfig,
    /// Daily plan configuration.
    pub plan: PlanConfig,
}

/// Data file location configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory for the JSON data files. Defaults to `<amble_home>/data`.
    pub data_dir: Option<PathBuf>,
}

impl StorageConfig {
    /// The data directory to use, falling back to the default location.
    pub fn resolved_data_dir(&self) -> Option<PathBuf> {
        self.data_dir.clone().or_else(data_dir)
    }
}

/// Coach alert dispatch configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AlertsConfig {
    /// Whether raised alerts are dispatched to the coach channel. When
    /// false, alerts stay PENDING for later operational retry.
    pub dispatch: bool,
    /// Coach address included in dispatched notices.
    pub coach_email: Option<String>,
}

/// Daily plan configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlanConfig {
    /// Minutes for the baseline movement slot on every plan.
    pub baseline_minutes: u32,
}

/// Minimum valid baseline minutes.
pub const MIN_BASELINE_MINUTES: u32 = 1;

/// Maximum valid baseline minutes. The anchor slot stays tiny on purpose;
/// anything longer belongs in a program, not the default.
pub const MAX_BASELINE_MINUTES: u32 = 5;

impl PlanConfig {
    /// Check if a baseline_minutes value is valid.
    pub fn is_valid_baseline(value: u32) -> bool {
        (MIN_BASELINE_MINUTES..=MAX_BASELINE_MINUTES).contains(&value)
    }
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            baseline_minutes: 3,
        }
    }
}

impl Config {
    /// Load configuration from every source.
    ///
    /// Strongest to weakest:
    /// 1. Environment variables
    /// 2. Project config (`.amble/config.toml` in cwd)
    /// 3. User config (`~/.amble/config.toml`)
    /// 4. Built-in defaults
    pub fn load() -> Self {
        // If cwd is unavailable, still apply the user config and env
        // overrides rather than touching paths through an empty PathBuf.
        match env::current_dir() {
            Ok(cwd) => Self::load_from_cwd(&cwd),
            Err(_) => {
                let mut config = Config::default();
                if let Some(user_config) = Self::load_user_config() {
                    config = config.merge(user_config);
                }
                config.apply_env_overrides();
                config.validate();
                config
            }
        }
    }

    /// Load configuration with a specific working directory.
    pub fn load_from_cwd(cwd: &Path) -> Self {
        // Start with defaults
        let mut config = Config::default();

        // User config over the defaults
        if let Some(user_config) = Self::load_user_config() {
            config = config.merge(user_config);
        }

        // Project config over user config
        if let Some(project_config) = Self::load_project_config(cwd) {
            config = config.merge(project_config);
        }

        // Env overrides apply last
        config.apply_env_overrides();

        config.validate();
        config
    }

    /// Load user config from `~/.amble/config.toml`.
    fn load_user_config() -> Option<Config> {
        let home = amble_home()?;
        let config_path = home.join("config.toml");
        Self::load_from_file(&config_path).ok()
    }

    /// Load project config from `.amble/config.toml` in the given directory.
    fn load_project_config(cwd: &Path) -> Option<Config> {
        let config_path = cwd.join(".amble").join("config.toml");
        Self::load_from_file(&config_path).ok()
    }

    /// Load config from a specific file path.
    fn load_from_file(path: &Path) -> Result<Config> {
        let content = fs::read_to_string(path).map_err(|e| AmbleError::storage(path, e))?;
        toml::from_str(&content).map_err(|e| AmbleError::config(e.to_string()))
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        // AMBLE_DATA_DIR
        if let Ok(val) = env::var("AMBLE_DATA_DIR") {
            if val.is_empty() {
                eprintln!("Warning: AMBLE_DATA_DIR is empty. Ignoring.");
            } else {
                self.storage.data_dir = Some(PathBuf::from(val));
            }
        }

        // AMBLE_DISPATCH
        if let Ok(val) = env::var("AMBLE_DISPATCH") {
            self.alerts.dispatch = val == "true" || val == "1";
        }

        // AMBLE_COACH_EMAIL
        if let Ok(val) = env::var("AMBLE_COACH_EMAIL") {
            if val.is_empty() {
                self.alerts.coach_email = None;
            } else {
                self.alerts.coach_email = Some(val);
            }
        }

        // AMBLE_BASELINE_MINUTES
        if let Ok(val) = env::var("AMBLE_BASELINE_MINUTES") {
            match val.parse::<u32>() {
                Ok(n) => {
                    if PlanConfig::is_valid_baseline(n) {
                        self.plan.baseline_minutes = n;
                    } else {
                        eprintln!(
                            "Warning: Invalid AMBLE_BASELINE_MINUTES value '{}'. \
                            Must be between {} and {}. Using default '{}'.",
                            n,
                            MIN_BASELINE_MINUTES,
                            MAX_BASELINE_MINUTES,
                            self.plan.baseline_minutes
                        );
                    }
                }
                Err(_) => eprintln!(
                    "Warning: Invalid AMBLE_BASELINE_MINUTES value '{}'. \
                    Expected a positive integer. Using default '{}'.",
                    val, self.plan.baseline_minutes
                ),
            }
        }
    }

    /// Reset out-of-range values that slipped in through config files.
    fn validate(&mut self) {
        if !PlanConfig::is_valid_baseline(self.plan.baseline_minutes) {
            eprintln!(
                "Warning: Invalid plan.baseline_minutes value '{}'. \
                Must be between {} and {}. Using default '{}'.",
                self.plan.baseline_minutes,
                MIN_BASELINE_MINUTES,
                MAX_BASELINE_MINUTES,
                PlanConfig::default().baseline_minutes
            );
            self.plan.baseline_minutes = PlanConfig::default().baseline_minutes;
        }
    }

    /// Merge another config into this one.
    ///
    /// The `other` config takes precedence: its non-default fields are
    /// applied over `self`, enabling additive layering where each layer
    /// only specifies its customizations. A layer cannot explicitly reset
    /// a field back to the default value, since "unset" and "set to
    /// default" are indistinguishable after parsing.
    fn merge(mut self, other: Config) -> Self {
        if other.storage.data_dir.is_some() {
            self.storage.data_dir = other.storage.data_dir;
        }

        let default_alerts = AlertsConfig::default();
        if other.alerts.dispatch != default_alerts.dispatch {
            self.alerts.dispatch = other.alerts.dispatch;
        }
        if other.alerts.coach_email.is_some() {
            self.alerts.coach_email = other.alerts.coach_email;
        }

        let default_plan = PlanConfig::default();
        if other.plan.baseline_minutes != default_plan.baseline_minutes {
            self.plan.baseline_minutes = other.plan.baseline_minutes;
        }

        self
    }
}

/// Get the Amble home directory.
///
/// Checks `AMBLE_HOME` environment variable first, then falls back to
/// `~/.amble`.
///
/// # Validation
///
/// An `AMBLE_HOME` value must be non-empty; relative values are
/// canonicalized. Anything unusable is ignored in favor of the default.
pub fn amble_home() -> Option<PathBuf> {
    // Check AMBLE_HOME env var first
    if let Ok(home) = env::var("AMBLE_HOME") {
        // Empty value is treated as unset
        if home.is_empty() {
            tracing::warn!("AMBLE_HOME is empty, using default");
        } else {
            let path = PathBuf::from(&home);
            // Absolute paths pass through untouched
            if path.is_absolute() {
                return Some(path);
            }
            // Relative paths get resolved against the current directory
            if let Ok(canonical) = path.canonicalize() {
                return Some(canonical);
            }
            // Nonexistent relative path: keep it as given, with a warning
            tracing::warn!("AMBLE_HOME is relative and doesn't exist, using as-is");
            return Some(path);
        }
    }

    // Fall back to ~/.amble
    if let Some(home) = dirs::home_dir() {
        return Some(home.join(".amble"));
    }

    // Containers and stripped-down environments may lack HOME entirely
    let fallback_path = fallback_amble_home();
    tracing::warn!(
        "HOME is unset, falling back to {}",
        fallback_path.display()
    );
    Some(fallback_path)
}

/// Get fallback amble home path when HOME is unavailable.
#[cfg(unix)]
fn fallback_amble_home() -> PathBuf {
    use std::os::unix::fs::MetadataExt;
    // UID keeps the temp directory distinct per user
    let uid = std::fs::metadata("/").map(|m| m.uid()).unwrap_or(0);
    PathBuf::from(format!("/tmp/amble-{}", uid))
}

/// Get fallback amble home path when HOME is unavailable.
#[cfg(not(unix))]
fn fallback_amble_home() -> PathBuf {
    std::env::temp_dir().join("amble")
}

/// Get the default data directory.
///
/// Returns `<amble_home>/data/`.
pub fn data_dir() -> Option<PathBuf> {
    amble_home().map(|h| h.join("data"))
}

/// Get the crash log path.
///
/// Returns `<amble_home>/crash.log`.
pub fn crash_log_path() -> Option<PathBuf> {
    amble_home().map(|h| h.join("crash.log"))
}
