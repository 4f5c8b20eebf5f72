use booster_core::{Error, PolicyConfig, Result, TerminationMode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Main configuration for the booster
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Protected and essential membership lists
    pub policy: PolicyConfig,

    /// Device and snapshot source
    pub device: DeviceConfig,

    /// Logging configuration
    pub logging: LogConfig,

    /// Repeated runs
    pub watch: WatchConfig,
}

/// Device description, used to pick the snapshot source
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Manufacturer string as reported by the device (default: "generic")
    pub manufacturer: String,

    /// Platform SDK level (default: 34)
    pub sdk_level: u32,

    /// Our own process name, never closed
    /// Defaults to the name of the running binary
    pub self_identifier: String,

    /// JSON snapshot exported by the host bridge
    /// When unset the local process table is enumerated
    pub snapshot_file: Option<PathBuf>,

    /// Identifiers the host reports as foreground
    /// Only used with the local process table
    pub foreground: BTreeSet<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log directory path (default: ./logs/)
    pub log_dir: PathBuf,

    /// Log file name, rotated daily (default: booster.log)
    pub log_file: String,
}

/// Watch loop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Seconds between runs (default: 30)
    pub interval_secs: u64,

    /// Mode used by the watch loop (default: normal)
    pub mode: TerminationMode,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            manufacturer: "generic".to_string(),
            sdk_level: 34,
            self_identifier: default_self_identifier(),
            snapshot_file: None,
            foreground: BTreeSet::new(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("./logs"),
            log_file: "booster.log".to_string(),
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            interval_secs: 30,
            mode: TerminationMode::Normal,
        }
    }
}

/// Process name of the running binary, as the process table reports it.
fn default_self_identifier() -> String {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "booster".to_string())
}

impl Config {
    /// Load configuration from TOML file
    ///
    /// # Example
    /// ```no_run
    /// use booster_cli::config::Config;
    ///
    /// let config = Config::load_from_file("/etc/booster/config.toml").unwrap();
    /// println!("Protected apps: {:?}", config.policy.protected_apps);
    /// ```
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Save configuration to TOML file
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.device.self_identifier.trim().is_empty() {
            return Err("Self identifier must not be empty".to_string());
        }

        if self.device.sdk_level == 0 {
            return Err("SDK level must be > 0".to_string());
        }

        if self.policy.protected_apps.iter().any(|a| a.is_empty()) {
            return Err("Protected apps must not contain empty entries".to_string());
        }

        if self.policy.essential_apps.iter().any(|a| a.is_empty()) {
            return Err("Essential apps must not contain empty entries".to_string());
        }

        if self.watch.interval_secs == 0 {
            return Err("Watch interval must be > 0".to_string());
        }

        Ok(())
    }

    pub fn log_path(&self) -> PathBuf {
        self.logging.log_dir.join(&self.logging.log_file)
    }
}
