// ── Command Runner ──
//
// The narrow seam between the bridge and the operating system. Every
// data access and mutation is a shell command whose combined output
// comes back as lines. Nothing here raises: spawn failures are folded
// into the output so callers see one failure convention, the error
// marker.

use std::path::PathBuf;
use std::process::Command;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::error::CoreError;

/// Substring that marks a command as failed, matched case-insensitively
/// on every output line. The tools involved may exit 0 while printing
/// an error, so exit status is not consulted.
const ERROR_MARKER: &str = "error";

/// Executes a command string and captures its output.
pub trait CommandRunner: Send + Sync {
    fn run(&self, command: &str) -> CommandOutput;
}

impl<R: CommandRunner + ?Sized> CommandRunner for Arc<R> {
    fn run(&self, command: &str) -> CommandOutput {
        (**self).run(command)
    }
}

// ── CommandOutput ───────────────────────────────────────────────────

/// Captured output of one command: stdout lines, then stderr lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    lines: Vec<String>,
    exit_ok: bool,
}

impl CommandOutput {
    pub fn new(lines: Vec<String>, exit_ok: bool) -> Self {
        Self { lines, exit_ok }
    }

    /// Convenience for fakes: successful exit with the given lines.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(lines.into_iter().map(Into::into).collect(), true)
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn first_line(&self) -> Option<&str> {
        self.lines.first().map(String::as_str)
    }

    /// Whether the process exited with status zero. Informational only.
    pub fn exit_ok(&self) -> bool {
        self.exit_ok
    }

    /// All lines joined with single spaces.
    pub fn joined(&self) -> String {
        self.lines.join(" ")
    }

    /// The first line carrying the error marker, if any.
    pub fn error_line(&self) -> Option<&str> {
        self.lines
            .iter()
            .find(|line| line.to_lowercase().contains(ERROR_MARKER))
            .map(String::as_str)
    }

    pub fn has_error_marker(&self) -> bool {
        self.error_line().is_some()
    }

    /// Convert the error-marker convention into a `Result`.
    pub fn check(self, command: &str) -> Result<Self, CoreError> {
        match self.error_line() {
            Some(line) => Err(CoreError::command_failed(command, line)),
            None => Ok(self),
        }
    }
}

// ── ShellRunner ─────────────────────────────────────────────────────

/// Runs commands through `bash -c`, merging stdout and stderr.
///
/// Blocking and without a timeout: a hung command blocks the calling
/// thread until it exits.
#[derive(Debug, Clone)]
pub struct ShellRunner {
    shell: PathBuf,
}

impl ShellRunner {
    pub fn new(shell: impl Into<PathBuf>) -> Self {
        Self {
            shell: shell.into(),
        }
    }
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::new("/bin/bash")
    }
}

impl CommandRunner for ShellRunner {
    fn run(&self, command: &str) -> CommandOutput {
        trace!(%command, "running command");

        let output = match Command::new(&self.shell).arg("-c").arg(command).output() {
            Ok(output) => output,
            Err(e) => {
                debug!(%command, error = %e, "command could not be spawned");
                return CommandOutput::new(vec![format!("error: failed to spawn: {e}")], false);
            }
        };

        let lines = String::from_utf8_lossy(&output.stdout)
            .lines()
            .chain(String::from_utf8_lossy(&output.stderr).lines())
            .map(str::to_owned)
            .collect();

        CommandOutput::new(lines, output.status.success())
    }
}

/// Quote `arg` for safe interpolation into a POSIX shell command line.
pub fn shell_quote(arg: &str) -> String {
    format!("'{}'", arg.replace('\'', r"'\''"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn error_marker_is_case_insensitive() {
        let out = CommandOutput::from_lines(["ok", "Error: no such table: group"]);
        assert!(out.has_error_marker());
        assert_eq!(out.error_line(), Some("Error: no such table: group"));
    }

    #[test]
    fn error_marker_ignores_exit_status() {
        let out = CommandOutput::new(vec!["ERROR while loading".into()], true);
        assert!(out.check("x").is_err());

        let out = CommandOutput::new(vec!["all good".into()], false);
        assert!(out.check("x").is_ok());
    }

    #[test]
    fn check_reports_command_and_line() {
        let err = CommandOutput::from_lines(["Error: database is locked"])
            .check("sqlite3 db")
            .unwrap_err();
        match err {
            CoreError::CommandFailed { command, detail } => {
                assert_eq!(command, "sqlite3 db");
                assert_eq!(detail, "Error: database is locked");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn shell_quote_escapes_single_quotes() {
        assert_eq!(shell_quote("plain"), "'plain'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
    }

    #[test]
    fn shell_runner_captures_stdout_and_stderr() {
        let runner = ShellRunner::default();
        let out = runner.run("echo one; echo two 1>&2");
        assert_eq!(out.lines(), ["one", "two"]);
        assert!(out.exit_ok());
    }

    #[test]
    fn shell_runner_never_raises_on_missing_shell() {
        let runner = ShellRunner::new("/nonexistent/shell");
        let out = runner.run("true");
        assert!(out.has_error_marker());
        assert!(!out.exit_ok());
    }
}
