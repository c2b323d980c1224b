use std::time::Duration;

use futures_util::future::BoxFuture;

/// A single command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    pub command: String,
    /// Remote host. `None` runs locally.
    pub host: Option<String>,
    pub timeout: Duration,
    /// Local shell used as `<shell> -c <command>`.
    pub shell: Option<String>,
}

/// Captured result of a command.
///
/// Nonzero exits and timeouts are ordinary results here; only failures to
/// launch the command at all surface as `ExecutorError`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` when the process was killed (timeout or signal).
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
}

impl CommandOutput {
    pub fn exited(code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            exit_code: Some(code),
            stdout: stdout.into(),
            stderr: stderr.into(),
            timed_out: false,
        }
    }

    pub fn timed_out() -> Self {
        Self {
            timed_out: true,
            ..Self::default()
        }
    }

    /// stdout followed by stderr, as scanned for keywords.
    pub fn combined(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    #[error("failed to launch command: {0}")]
    Spawn(String),

    #[error("I/O error while running command: {0}")]
    Io(String),
}

/// Single-quote `s` for a POSIX shell.
pub fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

/// Runs shell commands locally or on a remote host.
pub trait CommandExecutor: Send + Sync {
    fn execute<'a>(
        &'a self,
        request: &'a CommandRequest,
    ) -> BoxFuture<'a, Result<CommandOutput, ExecutorError>>;
}
