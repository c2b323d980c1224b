//! Command execution via `tokio::process`.
//!
//! Local commands run as `<shell> -c <command>`. Remote commands run through
//! `ssh` in batch mode, so a missing key fails fast instead of prompting.
//! A command that outlives its timeout is killed and reported as a
//! timed-out [`CommandOutput`], not as an error.

use std::process::Stdio;
use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use yawe_core::exec::{CommandExecutor, CommandOutput, CommandRequest, ExecutorError};

/// Shell used when a local request does not name one.
const DEFAULT_SHELL: &str = "/bin/sh";

/// Seconds ssh waits for the TCP connection before giving up.
const SSH_CONNECT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Default)]
pub struct ProcessExecutor;

impl ProcessExecutor {
    pub fn new() -> Self {
        Self
    }
}

/// Argument vector for `request`, program first.
pub fn command_argv(request: &CommandRequest) -> Vec<String> {
    match &request.host {
        Some(host) => {
            let mut argv = ssh_prefix(host);
            argv.push(request.command.clone());
            argv
        }
        None => vec![
            request
                .shell
                .clone()
                .unwrap_or_else(|| DEFAULT_SHELL.to_string()),
            "-c".to_string(),
            request.command.clone(),
        ],
    }
}

/// `ssh` invocation up to and including the host.
pub fn ssh_prefix(host: &str) -> Vec<String> {
    vec![
        "ssh".to_string(),
        "-o".to_string(),
        "BatchMode=yes".to_string(),
        "-o".to_string(),
        format!("ConnectTimeout={SSH_CONNECT_TIMEOUT_SECS}"),
        host.to_string(),
    ]
}

/// Run `argv` to completion, capturing output, killing it after `timeout`.
pub(crate) async fn run_argv(argv: &[String], timeout: Duration) -> Result<CommandOutput, ExecutorError> {
    let Some((program, args)) = argv.split_first() else {
        return Err(ExecutorError::Spawn("empty command line".to_string()));
    };

    let child = tokio::process::Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| ExecutorError::Spawn(format!("{program}: {e}")))?;

    // Dropping the wait future on timeout drops the child, which kills it.
    match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => Ok(CommandOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            timed_out: false,
        }),
        Ok(Err(e)) => Err(ExecutorError::Io(format!("{program}: {e}"))),
        Err(_) => Ok(CommandOutput::timed_out()),
    }
}

impl CommandExecutor for ProcessExecutor {
    fn execute<'a>(
        &'a self,
        request: &'a CommandRequest,
    ) -> BoxFuture<'a, Result<CommandOutput, ExecutorError>> {
        async move {
            let argv = command_argv(request);
            tracing::debug!(
                host = request.host.as_deref().unwrap_or("local"),
                command = %request.command,
                timeout_secs = request.timeout.as_secs(),
                "running command"
            );
            let output = run_argv(&argv, request.timeout).await?;
            if output.timed_out {
                tracing::warn!(command = %request.command, timeout_secs = request.timeout.as_secs(), "command timed out");
            } else {
                tracing::debug!(exit_code = ?output.exit_code, "command finished");
            }
            Ok(output)
        }
        .boxed()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
