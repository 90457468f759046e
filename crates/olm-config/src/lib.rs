//! Secure settings storage and application configuration for olm.
//!
//! User settings (which carry credentials) live in a [`SecretStore`],
//! the OS keyring by default. Non-secret tuning lives in [`AppConfig`],
//! loaded from compiled defaults, `config.toml` and `OLM_` environment
//! variables.

mod secret_store;
mod settings_store;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use olm_core::{CoordinatorConfig, ValidationError};

pub use secret_store::{FileStore, KeyringStore, MemoryStore, SecretStore};
pub use settings_store::{SETTINGS_KEY, SettingsStore};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error(transparent)]
    Settings(#[from] ValidationError),

    #[error("{backend} store error: {message}")]
    Backend {
        backend: &'static str,
        message: String,
    },

    #[error("failed to (de)serialize settings: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── Application config ──────────────────────────────────────────────

/// Non-secret application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// Status pull period while connected, in seconds. 0 disables the timer.
    pub sync_interval_secs: u64,

    /// Keyring service name settings are stored under.
    pub keyring_service: String,

    /// Use this plaintext file instead of the keyring.
    pub settings_file: Option<PathBuf>,

    pub log: LogDefaults,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LogDefaults {
    /// `EnvFilter` directive used when neither `RUST_LOG` nor `-v` is given.
    pub filter: String,
    pub json: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            sync_interval_secs: 5,
            keyring_service: "olm".into(),
            settings_file: None,
            log: LogDefaults::default(),
        }
    }
}

impl Default for LogDefaults {
    fn default() -> Self {
        Self {
            filter: "warn".into(),
            json: false,
        }
    }
}

impl AppConfig {
    pub fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            sync_interval: Duration::from_secs(self.sync_interval_secs),
        }
    }

    /// The secret store these settings select.
    pub fn secret_store(&self) -> Arc<dyn SecretStore> {
        open_secret_store(self.settings_file.as_deref(), &self.keyring_service)
    }
}

/// The plaintext file backend when `file` is given, else the keyring.
pub fn open_secret_store(file: Option<&Path>, keyring_service: &str) -> Arc<dyn SecretStore> {
    match file {
        Some(path) => Arc::new(FileStore::new(path)),
        None => Arc::new(KeyringStore::new(keyring_service)),
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("net", "pangolin", "olm").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("olm");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the app config from the canonical path and the environment.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    load_app_config_from(&config_path())
}

/// Load the app config from `path` and the environment.
///
/// Nested keys use a double underscore: `OLM_LOG__JSON=true`.
pub fn load_app_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    let config: AppConfig = Figment::new()
        .merge(Serialized::defaults(AppConfig::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("OLM_").split("__"))
        .extract()?;

    if config.keyring_service.trim().is_empty() {
        return Err(ConfigError::Validation {
            field: "keyring_service".into(),
            reason: "must not be empty".into(),
        });
    }
    Ok(config)
}
