//! Agent configuration
//!
//! Loaded from a TOML file when one is available, then overridden from the
//! environment.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::monitor::MonitorConfig;

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "NETPULSE_CONFIG";

/// Main agent configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Worker timing
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// Capacity of the report and notification channels
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Spawn a replacement worker after an abnormal termination
    #[serde(default = "default_true")]
    pub restart_on_failure: bool,

    /// Delay before a replacement worker is spawned
    #[serde(default = "default_restart_delay")]
    pub restart_delay_ms: u64,

    /// Log level used when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_channel_capacity() -> usize {
    16
}

fn default_true() -> bool {
    true
}

fn default_restart_delay() -> u64 {
    1000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            monitor: MonitorConfig::default(),
            channel_capacity: default_channel_capacity(),
            restart_on_failure: true,
            restart_delay_ms: default_restart_delay(),
            log_level: default_log_level(),
        }
    }
}

impl AgentConfig {
    /// Load configuration from file (if any) and environment
    pub fn load() -> anyhow::Result<Self> {
        let mut config = match Self::config_path() {
            Some(path) if path.exists() => Self::from_file(&path)?,
            Some(path) if std::env::var_os(CONFIG_PATH_ENV).is_some() => {
                bail!("Config file {} does not exist", path.display())
            }
            _ => Self::default(),
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Explicit path from the environment, else the per-user config file
    pub fn config_path() -> Option<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
            return Some(PathBuf::from(path));
        }

        ProjectDirs::from("io", "netpulse", "netpulse")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_str(&contents)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Load configuration from a TOML string
    pub fn from_str(contents: &str) -> anyhow::Result<Self> {
        let config: AgentConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides looked up through `var`
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> anyhow::Result<()> {
        if let Some(level) = var("NETPULSE_LOG_LEVEL") {
            self.log_level = level;
        }

        if let Some(ms) = var("NETPULSE_REGULAR_INTERVAL_MS") {
            self.monitor.regular_interval_ms = ms
                .parse()
                .with_context(|| format!("NETPULSE_REGULAR_INTERVAL_MS: invalid value {}", ms))?;
        }

        if let Some(ms) = var("NETPULSE_BURST_INTERVAL_MS") {
            self.monitor.burst_interval_ms = ms
                .parse()
                .with_context(|| format!("NETPULSE_BURST_INTERVAL_MS: invalid value {}", ms))?;
        }

        if let Some(ticks) = var("NETPULSE_BURST_TICKS") {
            self.monitor.burst_ticks = ticks
                .parse()
                .with_context(|| format!("NETPULSE_BURST_TICKS: invalid value {}", ticks))?;
        }

        Ok(())
    }

    /// Reject values the worker cannot run with
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.monitor.regular_interval_ms == 0 {
            bail!("monitor.regular_interval_ms must be greater than zero");
        }
        if self.monitor.burst_interval_ms == 0 {
            bail!("monitor.burst_interval_ms must be greater than zero");
        }
        if self.channel_capacity == 0 {
            bail!("channel_capacity must be greater than zero");
        }
        Ok(())
    }

    pub fn restart_delay(&self) -> Duration {
        Duration::from_millis(self.restart_delay_ms)
    }

    /// Generate example TOML config
    pub fn example_toml() -> &'static str {
        r##"# netpulse agent configuration
# =============================

# Log level used when RUST_LOG is not set
# Options: "trace", "debug", "info", "warn", "error"
log_level = "info"

# Capacity of the report and notification channels. A full channel blocks
# the worker until the consumer catches up.
channel_capacity = 16

# Spawn a fresh worker after an abnormal termination. The replacement waits
# for a new start signal.
restart_on_failure = true
restart_delay_ms = 1000

[monitor]
# Regular sampling interval
regular_interval_ms = 3000
# Sampling interval during a burst window
burst_interval_ms = 1200
# Burst ticks granted per burst signal
burst_ticks = 9
"##
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = AgentConfig::default();
        assert_eq!(config.monitor, MonitorConfig::default());
        assert_eq!(config.channel_capacity, 16);
        assert!(config.restart_on_failure);
        assert_eq!(config.restart_delay(), Duration::from_secs(1));
        assert_eq!(config.log_level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_example_toml_matches_defaults() {
        let config = AgentConfig::from_str(AgentConfig::example_toml()).unwrap();
        assert_eq!(config, AgentConfig::default());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let toml = r#"
log_level = "debug"

[monitor]
burst_ticks = 3
"#;

        let config = AgentConfig::from_str(toml).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.monitor.burst_ticks, 3);
        assert_eq!(config.monitor.regular_interval_ms, 3000);
        assert_eq!(config.monitor.burst_interval_ms, 1200);
        assert_eq!(config.channel_capacity, 16);
    }

    #[test]
    fn test_zero_interval_rejected() {
        let toml = r#"
[monitor]
regular_interval_ms = 0
"#;
        assert!(AgentConfig::from_str(toml).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AgentConfig::default();
        config
            .apply_env(env(&[
                ("NETPULSE_LOG_LEVEL", "trace"),
                ("NETPULSE_REGULAR_INTERVAL_MS", "5000"),
                ("NETPULSE_BURST_INTERVAL_MS", "500"),
                ("NETPULSE_BURST_TICKS", "4"),
            ]))
            .unwrap();

        assert_eq!(config.log_level, "trace");
        assert_eq!(config.monitor.regular_interval_ms, 5000);
        assert_eq!(config.monitor.burst_interval_ms, 500);
        assert_eq!(config.monitor.burst_ticks, 4);
    }

    #[test]
    fn test_invalid_env_override() {
        let mut config = AgentConfig::default();
        let result = config.apply_env(env(&[("NETPULSE_BURST_TICKS", "many")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "restart_on_failure = false\n\n[monitor]\nregular_interval_ms = 10000").unwrap();

        let config = AgentConfig::from_file(file.path()).unwrap();
        assert!(!config.restart_on_failure);
        assert_eq!(config.monitor.regular_interval_ms, 10000);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(AgentConfig::from_file(&dir.path().join("missing.toml")).is_err());
    }
}
