//! Configuration module for ergrace
//!
//! Configuration is read from a TOML file. Every section and every key is
//! optional; missing values fall back to the defaults below (one poll per
//! second, ten read retries 100 ms apart).
//!
//! # Config Location
//!
//! Without an explicit `--config` path the file is looked up in the
//! platform-appropriate config directory:
//!
//! - **Linux**: `~/.config/ergrace/config.toml`
//! - **macOS**: `~/Library/Application Support/ergrace/config.toml`
//! - **Windows**: `%APPDATA%\ergrace\config.toml`
//!
//! # Example
//!
//! ```toml
//! [device]
//! driver = "simulated"
//! read_retries = 10
//! read_retry_delay_ms = 100
//!
//! [output]
//! directory = "/srv/ergrace"
//!
//! [poll]
//! interval_ms = 1000
//! skip_unchanged = false
//!
//! [simulator]
//! reset_after_meters = 100000.0
//! ```

use crate::error::{ErgError, Result};
use crate::retry::RetryPolicy;
use crate::shutdown::ShutdownSignal;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application identifier for config directories
pub const APP_ID: &str = "ergrace";

/// Config filename
pub const CONFIG_FILE: &str = "config.toml";

/// Default time between polls in milliseconds
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// Default pause between connect attempts in milliseconds
pub const DEFAULT_CONNECT_RETRY_DELAY_MS: u64 = 1000;

/// Default number of retries for a glitching read
pub const DEFAULT_READ_RETRIES: u32 = 10;

/// Default pause between read retries in milliseconds
pub const DEFAULT_READ_RETRY_DELAY_MS: u64 = 100;

/// Default pause before rebuilding a lost session in milliseconds
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 1000;

/// Get the path of the default config file
pub fn default_config_path() -> Option<PathBuf> {
    dirs_next::config_dir().map(|p| p.join(APP_ID).join(CONFIG_FILE))
}

// ==================== App Config ====================

/// Complete application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Device selection and retry settings
    pub device: DeviceConfig,
    /// Where the CSV logs go
    pub output: OutputConfig,
    /// Poll loop settings
    pub poll: PollConfig,
    /// Simulated rower settings
    pub simulator: SimulatorConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ErgError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        Self::from_toml(&content)
            .map_err(|e| e.with_context(format!("Invalid config file {:?}", path)))
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ErgError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load the given file, or the default file if it exists, or defaults
    ///
    /// An explicitly named file must exist; a missing default file is not an
    /// error.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }

        match default_config_path() {
            Some(path) if path.exists() => {
                tracing::info!("Loading config from {:?}", path);
                Self::load(path)
            }
            _ => Ok(Self::default()),
        }
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ErgError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| ErgError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content).map_err(|e| {
            ErgError::Config(format!("Failed to write config file {:?}: {}", path, e))
        })
    }

    /// Check values that would make the run meaningless
    pub fn validate(&self) -> Result<()> {
        let sim = &self.simulator;
        if !(sim.pace_secs.is_finite() && sim.pace_secs > 0.0) {
            return Err(ErgError::Config(format!(
                "simulator.pace_secs must be positive, got {}",
                sim.pace_secs
            )));
        }
        if sim.spm == 0 {
            return Err(ErgError::Config("simulator.spm must be positive".to_string()));
        }
        if sim.fail_every == Some(0) {
            return Err(ErgError::Config(
                "simulator.fail_every must be positive when set".to_string(),
            ));
        }
        Ok(())
    }
}

// ==================== Device Config ====================

/// Which driver provides device access
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    /// Built-in simulated rower
    #[default]
    Simulated,
}

impl std::fmt::Display for DriverKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DriverKind::Simulated => write!(f, "simulated"),
        }
    }
}

/// Device selection and retry settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Driver to use
    pub driver: DriverKind,
    /// Pause between connect attempts while no monitor is attached
    pub connect_retry_delay_ms: u64,
    /// Retries for a read failing with a transient error
    pub read_retries: u32,
    /// Pause between read retries
    pub read_retry_delay_ms: u64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            driver: DriverKind::default(),
            connect_retry_delay_ms: DEFAULT_CONNECT_RETRY_DELAY_MS,
            read_retries: DEFAULT_READ_RETRIES,
            read_retry_delay_ms: DEFAULT_READ_RETRY_DELAY_MS,
        }
    }
}

impl DeviceConfig {
    /// Unbounded policy used while waiting for a monitor
    pub fn connect_policy(&self, shutdown: &ShutdownSignal) -> RetryPolicy {
        RetryPolicy::unbounded(Duration::from_millis(self.connect_retry_delay_ms))
            .announced()
            .with_shutdown(shutdown.clone())
    }

    /// Bounded policy used for each monitor read
    pub fn read_policy(&self, shutdown: &ShutdownSignal) -> RetryPolicy {
        RetryPolicy::bounded(
            self.read_retries,
            Duration::from_millis(self.read_retry_delay_ms),
        )
        .announced()
        .with_shutdown(shutdown.clone())
    }
}

// ==================== Output Config ====================

/// Where the CSV logs go
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory receiving `erg_<timestamp>.csv` files
    pub directory: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
        }
    }
}

// ==================== Poll Config ====================

/// Poll loop settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    /// Pause between two polls
    pub interval_ms: u64,
    /// Only log a reading when it differs from the previous one
    pub skip_unchanged: bool,
    /// Pause before rebuilding a lost session
    pub reconnect_delay_ms: u64,
    /// Stop after this many polls (runs until interrupted when unset)
    pub max_ticks: Option<u64>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_POLL_INTERVAL_MS,
            skip_unchanged: false,
            reconnect_delay_ms: DEFAULT_RECONNECT_DELAY_MS,
            max_ticks: None,
        }
    }
}

impl PollConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Unbounded policy used to rebuild a lost session
    pub fn reconnect_policy(&self, shutdown: &ShutdownSignal) -> RetryPolicy {
        RetryPolicy::unbounded(Duration::from_millis(self.reconnect_delay_ms))
            .announced()
            .with_shutdown(shutdown.clone())
    }
}

// ==================== Simulator Config ====================

/// Simulated rower settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Number of monitors to pretend are attached
    pub devices: usize,
    /// Serial number of the first monitor
    pub serial: String,
    /// Steady pace in seconds per 500 m
    pub pace_secs: f64,
    /// Steady stroke rate
    pub spm: u32,
    /// Fail every n-th monitor read with a transient error
    pub fail_every: Option<u64>,
    /// Drop off the bus once this distance is reached, then come back reset
    pub reset_after_meters: Option<f64>,
    /// Enumerations that find nothing after a reset
    pub offline_enumerations: u32,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            devices: 1,
            serial: "430000001".to_string(),
            pace_secs: 120.0,
            spm: 22,
            fail_every: None,
            reset_after_meters: None,
            offline_enumerations: 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.device.read_retries, 10);
        assert_eq!(config.device.read_retry_delay_ms, 100);
        assert_eq!(config.poll.interval(), Duration::from_secs(1));
        assert!(!config.poll.skip_unchanged);
        assert_eq!(config.poll.max_ticks, None);
        assert_eq!(config.output.directory, PathBuf::from("."));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [poll]
            skip_unchanged = true

            [simulator]
            reset_after_meters = 100000.0
            "#,
        )
        .unwrap();

        assert!(config.poll.skip_unchanged);
        assert_eq!(config.poll.interval_ms, DEFAULT_POLL_INTERVAL_MS);
        assert_eq!(config.simulator.reset_after_meters, Some(100_000.0));
        assert_eq!(config.device, DeviceConfig::default());
    }

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(AppConfig::from_toml("").unwrap(), AppConfig::default());
    }

    #[test]
    fn test_unknown_driver_rejected() {
        let err = AppConfig::from_toml("[device]\ndriver = \"bluetooth\"\n").unwrap_err();
        assert!(matches!(err, ErgError::Config(_)));
    }

    #[test]
    fn test_validate_rejects_bad_simulator() {
        let err = AppConfig::from_toml("[simulator]\npace_secs = 0.0\n").unwrap_err();
        assert!(err.to_string().contains("pace_secs"));

        let err = AppConfig::from_toml("[simulator]\nfail_every = 0\n").unwrap_err();
        assert!(err.to_string().contains("fail_every"));
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE);

        let mut config = AppConfig::default();
        config.poll.max_ticks = Some(42);
        config.simulator.fail_every = Some(7);
        config.save(&path).unwrap();

        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.toml");
        assert!(AppConfig::load_or_default(Some(&missing)).is_err());
    }

    #[test]
    fn test_policies_follow_config() {
        let shutdown = ShutdownSignal::new();
        let device = DeviceConfig::default();

        let read = device.read_policy(&shutdown);
        assert_eq!(read.max_retries(), Some(10));
        assert_eq!(read.delay(), Some(Duration::from_millis(100)));

        let connect = device.connect_policy(&shutdown);
        assert_eq!(connect.max_retries(), None);
        assert_eq!(connect.delay(), Some(Duration::from_secs(1)));

        let reconnect = PollConfig::default().reconnect_policy(&shutdown);
        assert_eq!(reconnect.max_retries(), None);
        assert!(read.is_announced() && connect.is_announced() && reconnect.is_announced());
    }
}
