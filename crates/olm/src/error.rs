//! CLI error types with miette diagnostics.

use miette::Diagnostic;
use thiserror::Error;

use olm_config::ConfigError;
use olm_core::{CoreError, ValidationError};

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const VALIDATION: i32 = 3;
    pub const STORAGE: i32 = 4;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Input ────────────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(olm::validation))]
    Validation { field: String, reason: String },

    #[error(transparent)]
    #[diagnostic(
        code(olm::invalid_settings),
        help("Run `olm settings show` to see the current values.")
    )]
    InvalidSettings(#[from] ValidationError),

    #[error("Could not read {what}: {reason}")]
    #[diagnostic(code(olm::prompt))]
    Prompt { what: &'static str, reason: String },

    // ── Storage ──────────────────────────────────────────────────────

    #[error("Settings store '{backend}' failed: {message}")]
    #[diagnostic(
        code(olm::storage),
        help(
            "If no keyring is available on this host, pass --settings-file\n\
             or set OLM_SETTINGS_FILE to use a plaintext file instead."
        )
    )]
    Storage {
        backend: &'static str,
        message: String,
    },

    #[error("Failed to load configuration: {message}")]
    #[diagnostic(code(olm::config), help("Check the config file and OLM_* environment variables."))]
    Config { message: String },

    #[error(transparent)]
    #[diagnostic(code(olm::core))]
    Core(CoreError),

    // ── IO / Serialization ────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    #[diagnostic(code(olm::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Validation { .. } | Self::InvalidSettings(_) => exit_code::VALIDATION,
            Self::Storage { .. } => exit_code::STORAGE,
            Self::Config { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── ConfigError / CoreError → CliError mapping ───────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::Settings(e) => Self::InvalidSettings(e),
            ConfigError::Backend { backend, message } => Self::Storage { backend, message },
            ConfigError::Serialization(e) => Self::Storage {
                backend: "settings",
                message: format!("stored record is unreadable: {e}"),
            },
            ConfigError::Figment(e) => Self::Config {
                message: e.to_string(),
            },
            ConfigError::Io(e) => Self::Io(e),
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(e) => Self::InvalidSettings(e),
            other => Self::Core(other),
        }
    }
}
