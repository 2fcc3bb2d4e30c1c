//! Configuration loading and persistence.
//!
//! Settings come from three layers, later ones winning: built-in defaults,
//! the JSON config file, and `MAKUO_*` environment variables. The binary
//! applies its command-line flags on top.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::time::Duration;
use std::{env, fs};

use crate::constants::{DEFAULT_READ_TIMEOUT, DEFAULT_SOCKET_PATH};

/// Persistent configuration for the makuo client.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Config {
    /// Path of the Unix socket the daemon listens on.
    #[serde(default = "default_socket_path")]
    pub socket_path: PathBuf,

    /// Working base directory; `None` asks the daemon via `status`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_dir: Option<PathBuf>,

    /// Transport read deadline in seconds; 0 waits indefinitely.
    #[serde(default = "default_read_timeout")]
    pub read_timeout: u64,

    /// Raise the daemon log level to 1 during the session.
    #[serde(default)]
    pub debug: bool,
}

fn default_socket_path() -> PathBuf {
    PathBuf::from(DEFAULT_SOCKET_PATH)
}

fn default_read_timeout() -> u64 {
    DEFAULT_READ_TIMEOUT.as_secs()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
            base_dir: None,
            read_timeout: default_read_timeout(),
            debug: false,
        }
    }
}

impl Config {
    /// Returns the configuration directory path, creating it if necessary.
    ///
    /// Priority order:
    /// 1. Unit tests: `tmp/makuo-test` under the crate directory
    /// 2. `MAKUO_CONFIG_DIR` environment variable: explicit override
    /// 3. Default: platform config dir (Linux: `~/.config/makuo`)
    ///
    /// # Errors
    ///
    /// Fails when no platform config directory exists or the directory
    /// cannot be created.
    pub fn config_dir() -> Result<PathBuf> {
        let dir = {
            #[cfg(test)]
            {
                PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tmp/makuo-test")
            }

            #[cfg(not(test))]
            {
                if let Ok(dir) = env::var("MAKUO_CONFIG_DIR") {
                    PathBuf::from(dir)
                } else {
                    dirs::config_dir()
                        .context("could not determine config directory")?
                        .join("makuo")
                }
            }
        };

        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create config directory {}", dir.display()))?;
        Ok(dir)
    }

    /// Load configuration, falling back to defaults when the file is
    /// missing or malformed, then apply environment overrides.
    ///
    /// # Errors
    ///
    /// Currently infallible; the `Result` leaves room for stricter
    /// validation without an API break.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from_file().unwrap_or_default();
        config.apply_env_overrides();
        Ok(config)
    }

    fn load_from_file() -> Result<Self> {
        let config_path = Self::config_dir()?.join("config.json");
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("failed to read {}", config_path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("invalid config file {}", config_path.display()))
    }

    /// Apply `MAKUO_*` environment variable overrides.
    ///
    /// - `MAKUO_SOCKET`: daemon socket path (tilde-expanded)
    /// - `MAKUO_BASE_DIR`: working base directory (tilde-expanded)
    /// - `MAKUO_READ_TIMEOUT`: read deadline in seconds, 0 to disable;
    ///   non-numeric values are ignored
    /// - `MAKUO_DEBUG`: `1`, `true`, or `yes` enables debug
    fn apply_env_overrides(&mut self) {
        if let Ok(socket) = env::var("MAKUO_SOCKET") {
            self.socket_path = PathBuf::from(shellexpand::tilde(&socket).into_owned());
        }
        if let Ok(base) = env::var("MAKUO_BASE_DIR") {
            self.base_dir = Some(PathBuf::from(shellexpand::tilde(&base).into_owned()));
        }
        if let Ok(timeout) = env::var("MAKUO_READ_TIMEOUT") {
            if let Ok(secs) = timeout.parse::<u64>() {
                self.read_timeout = secs;
            } else {
                log::warn!("[config] ignoring non-numeric MAKUO_READ_TIMEOUT: {timeout}");
            }
        }
        if let Ok(debug) = env::var("MAKUO_DEBUG") {
            self.debug = matches!(debug.as_str(), "1" | "true" | "yes");
        }
    }

    /// Persist the configuration with owner-only file permissions.
    ///
    /// # Errors
    ///
    /// Fails when the config directory is unusable or the file cannot be
    /// written.
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_dir()?.join("config.json");
        fs::write(&config_path, serde_json::to_string_pretty(self)?)
            .with_context(|| format!("failed to write {}", config_path.display()))?;

        #[cfg(unix)]
        fs::set_permissions(&config_path, fs::Permissions::from_mode(0o600))?;

        Ok(())
    }

    /// The read deadline as a `Duration`, or `None` when disabled.
    pub fn read_timeout_duration(&self) -> Option<Duration> {
        (self.read_timeout > 0).then_some(Duration::from_secs(self.read_timeout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_points_at_stock_daemon() {
        let config = Config::default();
        assert_eq!(config.socket_path, PathBuf::from("/var/run/makuosan.sock"));
        assert_eq!(config.base_dir, None);
        assert_eq!(config.read_timeout, 30);
        assert!(!config.debug);
    }

    #[test]
    fn read_timeout_zero_disables_deadline() {
        let config = Config {
            read_timeout: 0,
            ..Config::default()
        };
        assert_eq!(config.read_timeout_duration(), None);

        let config = Config {
            read_timeout: 90,
            ..Config::default()
        };
        assert_eq!(
            config.read_timeout_duration(),
            Some(Duration::from_secs(90))
        );
    }

    #[test]
    fn config_survives_serialization() {
        let config = Config {
            socket_path: PathBuf::from("/tmp/makuosan.sock"),
            base_dir: Some(PathBuf::from("/var/www")),
            read_timeout: 120,
            debug: true,
        };
        let json = serde_json::to_string(&config).unwrap();
        let restored: Config = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.socket_path, config.socket_path);
        assert_eq!(restored.base_dir, config.base_dir);
        assert_eq!(restored.read_timeout, 120);
        assert!(restored.debug);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.socket_path, PathBuf::from("/var/run/makuosan.sock"));
        assert_eq!(config.base_dir, None);
        assert_eq!(config.read_timeout, 30);
        assert!(!config.debug);
    }

    #[test]
    fn config_dir_is_redirected_under_tests() {
        let dir = Config::config_dir().unwrap();
        assert!(dir.ends_with("tmp/makuo-test"));
        assert!(dir.exists());
    }
}
