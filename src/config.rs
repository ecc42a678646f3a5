//! Configuration loading and validation.
//!
//! Loads `warden.toml` from `$WARDEN_CONFIG_PATH` or `~/.warden/warden.toml`.
//! Every section is optional; a missing file yields defaults.
//!
//! Precedence: env vars > config file > defaults.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

use crate::auth::{ReplayWindow, DEFAULT_REPLAY_WINDOW_SECS};

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "WARDEN_CONFIG_PATH";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WardenConfig {
    /// Authentication policy.
    pub auth: AuthConfig,

    /// Runtime persistence settings.
    pub runtime: RuntimeConfig,

    /// Log output settings.
    pub logging: LoggingConfig,
}

/// Authentication policy (`[auth]`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Maximum distance between a declared timestamp and the verifier's
    /// clock, in seconds.
    pub replay_window_secs: i64,

    /// Accept a distance of exactly `replay_window_secs`.
    pub inclusive_boundary: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            replay_window_secs: DEFAULT_REPLAY_WINDOW_SECS,
            inclusive_boundary: false,
        }
    }
}

impl AuthConfig {
    /// The replay window this section describes.
    pub fn replay_window(&self) -> ReplayWindow {
        ReplayWindow {
            max_skew_secs: self.replay_window_secs,
            inclusive: self.inclusive_boundary,
        }
    }
}

/// Runtime persistence settings (`[runtime]`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// SQLite file holding account state.
    pub state_db: PathBuf,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            state_db: default_root().join("state.db"),
        }
    }
}

/// Log output settings (`[logging]`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Directory for rotated JSON log files.
    pub logs_dir: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            logs_dir: default_root().join("logs"),
        }
    }
}

impl WardenConfig {
    /// Load configuration with env overrides applied.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed, or
    /// if the resulting configuration is invalid.
    pub fn load() -> anyhow::Result<Self> {
        let path = config_path_with(|key| std::env::var(key).ok())?;
        let mut config = Self::load_from_file(&path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file only; a missing file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(contents) => {
                tracing::info!(path = %path.display(), "loading config from file");
                Self::from_toml(&contents)
                    .with_context(|| format!("failed to parse config at {}", path.display()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "no config file found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "failed to read config at {}: {e}",
                path.display()
            )),
        }
    }

    /// Parse a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed.
    pub fn from_toml(toml_str: &str) -> anyhow::Result<Self> {
        let config: WardenConfig =
            toml::from_str(toml_str).context("failed to parse config TOML")?;
        Ok(config)
    }

    /// Apply environment overrides through `env`.
    ///
    /// Takes a resolver so tests never mutate the process environment.
    /// Unparsable values are ignored with a warning.
    pub fn apply_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(v) = env("WARDEN_REPLAY_WINDOW_SECS") {
            match v.parse() {
                Ok(n) => self.auth.replay_window_secs = n,
                Err(_) => tracing::warn!(
                    var = "WARDEN_REPLAY_WINDOW_SECS",
                    value = %v,
                    "ignoring invalid env override"
                ),
            }
        }
        if let Some(v) = env("WARDEN_INCLUSIVE_BOUNDARY") {
            match v.parse() {
                Ok(b) => self.auth.inclusive_boundary = b,
                Err(_) => tracing::warn!(
                    var = "WARDEN_INCLUSIVE_BOUNDARY",
                    value = %v,
                    "ignoring invalid env override"
                ),
            }
        }
        if let Some(v) = env("WARDEN_STATE_DB") {
            self.runtime.state_db = PathBuf::from(v);
        }
        if let Some(v) = env("WARDEN_LOGS_DIR") {
            self.logging.logs_dir = PathBuf::from(v);
        }
    }

    /// Reject settings no verifier could run with.
    ///
    /// # Errors
    ///
    /// Returns an error when the replay window is not positive.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.auth.replay_window_secs <= 0 {
            anyhow::bail!(
                "auth.replay_window_secs must be positive, got {}",
                self.auth.replay_window_secs
            );
        }
        Ok(())
    }
}

/// Resolve the config file path using a custom env resolver.
///
/// # Errors
///
/// Returns an error if no explicit path is set and the home directory
/// cannot be determined.
pub fn config_path_with(env: impl Fn(&str) -> Option<String>) -> anyhow::Result<PathBuf> {
    if let Some(p) = env(CONFIG_PATH_ENV) {
        return Ok(PathBuf::from(p));
    }
    Ok(config_dir()?.join("warden.toml"))
}

/// Resolve the default config directory (`~/.warden/`).
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn config_dir() -> anyhow::Result<PathBuf> {
    let home = directories::BaseDirs::new()
        .ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
    Ok(home.home_dir().join(".warden"))
}

fn default_root() -> PathBuf {
    config_dir().unwrap_or_else(|_| PathBuf::from(".warden"))
}
