//! CLI error types with miette diagnostics.
//!
//! Maps config and core failures into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use holebridge_config::ConfigError;
use holebridge_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Configuration ────────────────────────────────────────────────

    #[error("Invalid configuration: {field}: {reason}")]
    #[diagnostic(
        code(holebridge::validation),
        help(
            "Set the broker with MQTT_SERVER (process environment or {env_file}),\n\
             or in the [mqtt] section of the TOML config."
        )
    )]
    Validation {
        field: String,
        reason: String,
        env_file: String,
    },

    #[error("Configuration could not be loaded")]
    #[diagnostic(code(holebridge::config))]
    Config(#[source] ConfigError),

    // ── Host ─────────────────────────────────────────────────────────

    #[error("Cannot identify this device: {message}")]
    #[diagnostic(
        code(holebridge::identity),
        help("Set device.mac in the config file or HOLEBRIDGE_DEVICE__MAC.")
    )]
    Identity { message: String },

    #[error("Pi-hole command failed: {detail}")]
    #[diagnostic(
        code(holebridge::command_failed),
        help(
            "Command: {command}\n\
             Check that this user can read and write the gravity database."
        )
    )]
    CommandFailed { command: String, detail: String },

    // ── Everything else ──────────────────────────────────────────────

    #[error(transparent)]
    #[diagnostic(code(holebridge::core))]
    Core(CoreError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON output failed: {0}")]
    #[diagnostic(code(holebridge::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Validation { .. } | Self::Config(_) => exit_code::USAGE,
            Self::Identity { .. } => exit_code::CONNECTION,
            _ => exit_code::GENERAL,
        }
    }

    pub fn from_config(err: ConfigError, env_file: &std::path::Path) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation {
                field,
                reason,
                env_file: env_file.display().to_string(),
            },
            other => Self::Config(other),
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Identity { message } => Self::Identity { message },
            CoreError::CommandFailed { command, detail } => Self::CommandFailed { command, detail },
            other => Self::Core(other),
        }
    }
}
