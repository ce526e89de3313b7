// ── Core error types ──
//
// Errors surfaced by holebridge-core. Extraction misses and malformed
// store rows are not errors: they shrink the result instead. Everything
// here is recoverable at the poll-loop boundary except `Identity`,
// which only occurs during startup.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── External command errors ──────────────────────────────────────
    #[error("Command `{command}` failed: {detail}")]
    CommandFailed { command: String, detail: String },

    // ── Transport errors ─────────────────────────────────────────────
    #[error("Publish to {topic} failed: {reason}")]
    Publish { topic: String, reason: String },

    // ── Startup errors ───────────────────────────────────────────────
    #[error("Cannot determine device identity: {message}")]
    Identity { message: String },

    // ── Serialization errors ─────────────────────────────────────────
    #[error("Descriptor serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub(crate) fn command_failed(command: &str, detail: impl Into<String>) -> Self {
        Self::CommandFailed {
            command: command.to_owned(),
            detail: detail.into(),
        }
    }
}
