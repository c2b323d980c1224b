//! Command task: run a (templated) shell command locally or over ssh.
//!
//! Success requires every configured rule to pass, in order: exit code in the
//! allowed set, no error keyword in the output, at least one success keyword
//! (when any are configured), and every expected output file present with at
//! least its minimum size.

use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use serde_json::{Map, Value, json};
use yawe_types::config::TaskDefaults;
use yawe_types::error::SpecError;
use yawe_types::workflow::{CommandTaskConfig, ExecutorKind, ExpectedFile, TaskSpec};

use super::{RawResult, Task, TaskEnv, TaskFailure, merge_params};
use crate::exec::{CommandOutput, CommandRequest, shell_quote};

/// Timeout for the probes that check expected files on a remote host.
const FILE_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

pub struct CommandTask {
    spec: TaskSpec,
    config: CommandTaskConfig,
    timeout: Duration,
    shell: String,
    /// Command after template rendering; set by `prepare`.
    rendered: Option<String>,
}

impl CommandTask {
    pub const TYPE_TAG: &'static str = "command";

    pub fn new(spec: &TaskSpec, defaults: &TaskDefaults) -> Result<Self, SpecError> {
        let config: CommandTaskConfig = spec.decode_options().map_err(|message| {
            SpecError::InvalidTask {
                task: spec.name.clone(),
                message,
            }
        })?;

        let has_command = [&config.command_template, &config.command]
            .iter()
            .any(|c| c.as_deref().is_some_and(|c| !c.trim().is_empty()));
        if !has_command {
            return Err(SpecError::InvalidTask {
                task: spec.name.clone(),
                message: "either 'command' or 'command_template' is required".to_string(),
            });
        }
        if spec.executor == ExecutorKind::Ssh && spec.host.as_deref().is_none_or(str::is_empty) {
            return Err(SpecError::InvalidTask {
                task: spec.name.clone(),
                message: "'host' is required for the ssh executor".to_string(),
            });
        }

        Ok(Self {
            spec: spec.clone(),
            timeout: Duration::from_secs(spec.timeout_secs.unwrap_or(defaults.command_timeout)),
            shell: config
                .shell
                .clone()
                .unwrap_or_else(|| defaults.local_shell.clone()),
            config,
            rendered: None,
        })
    }

    /// The command as it will run (after `prepare`).
    pub fn rendered_command(&self) -> Option<&str> {
        self.rendered.as_deref()
    }

    fn host(&self) -> Option<String> {
        match self.spec.executor {
            ExecutorKind::Local => None,
            ExecutorKind::Ssh => self.spec.host.clone(),
        }
    }

    fn check_exit_code(&self, output: &CommandOutput) -> Result<(), TaskFailure> {
        if !self.config.check_exit_code {
            return Ok(());
        }
        match output.exit_code {
            Some(code) if self.config.allowed_exit_codes.contains(&code) => Ok(()),
            Some(code) => Err(TaskFailure::execution(format!(
                "exit code {code} not in allowed codes {:?}",
                self.config.allowed_exit_codes
            ))),
            None => Err(TaskFailure::execution("command terminated without an exit code")),
        }
    }

    fn check_keywords(&self, output: &CommandOutput) -> Result<(), TaskFailure> {
        let combined = output.combined();
        if self.config.check_error_keywords {
            if let Some(keyword) = self
                .config
                .error_keywords
                .iter()
                .find(|k| combined.contains(k.as_str()))
            {
                return Err(TaskFailure::execution(format!(
                    "output contains error keyword '{keyword}'"
                )));
            }
        }
        if !self.config.success_keywords.is_empty()
            && !self
                .config
                .success_keywords
                .iter()
                .any(|k| combined.contains(k.as_str()))
        {
            return Err(TaskFailure::execution(format!(
                "output contains none of the success keywords {:?}",
                self.config.success_keywords
            )));
        }
        Ok(())
    }

    async fn check_expected_file(&self, env: &TaskEnv, file: &ExpectedFile) -> Result<(), TaskFailure> {
        let size = match self.host() {
            None => match tokio::fs::metadata(&file.path).await {
                Ok(meta) if meta.is_file() => Some(meta.len()),
                _ => None,
            },
            Some(host) => {
                let quoted = shell_quote(&file.path);
                let request = CommandRequest {
                    command: format!("test -f {quoted} && stat -c %s {quoted}"),
                    host: Some(host),
                    timeout: FILE_PROBE_TIMEOUT,
                    shell: None,
                };
                let output = env
                    .executor
                    .execute(&request)
                    .await
                    .map_err(|e| TaskFailure::execution(format!("cannot probe '{}': {e}", file.path)))?;
                if output.exit_code == Some(0) {
                    match output.stdout.trim().parse::<u64>() {
                        Ok(size) => Some(size),
                        Err(_) => {
                            tracing::warn!(
                                task = %self.spec.name,
                                path = %file.path,
                                "could not read remote file size"
                            );
                            Some(u64::MAX)
                        }
                    }
                } else {
                    None
                }
            }
        };

        match size {
            None if file.must_exist => Err(TaskFailure::execution(format!(
                "expected output file missing: {}",
                file.path
            ))),
            Some(size) if size < file.min_size => Err(TaskFailure::execution(format!(
                "expected output file too small: {} ({size} < {} bytes)",
                file.path, file.min_size
            ))),
            _ => Ok(()),
        }
    }
}

impl Task for CommandTask {
    fn spec(&self) -> &TaskSpec {
        &self.spec
    }

    fn prepare(&mut self, env: &TaskEnv, bindings: &Value) -> Result<(), TaskFailure> {
        let command = match self.config.command_template.as_deref().filter(|t| !t.trim().is_empty()) {
            Some(template) => {
                let bindings = merge_params(bindings, &self.spec.params);
                env.renderer
                    .render(template, &bindings)
                    .map_err(|e| TaskFailure::configuration(format!("command template: {e}")))?
                    .trim()
                    .to_string()
            }
            None => self.config.command.clone().unwrap_or_default(),
        };
        if command.trim().is_empty() {
            return Err(TaskFailure::configuration("command rendered to an empty string"));
        }
        tracing::debug!(task = %self.spec.name, command = %command, "rendered command");
        self.rendered = Some(command);
        Ok(())
    }

    fn execute<'a>(&'a self, env: &'a TaskEnv) -> BoxFuture<'a, Result<RawResult, TaskFailure>> {
        async move {
            let command = self
                .rendered
                .clone()
                .ok_or_else(|| TaskFailure::configuration("command was not prepared"))?;
            let request = CommandRequest {
                command,
                host: self.host(),
                timeout: self.timeout,
                shell: match self.spec.executor {
                    ExecutorKind::Local => Some(self.shell.clone()),
                    ExecutorKind::Ssh => None,
                },
            };
            let output = env
                .executor
                .execute(&request)
                .await
                .map_err(|e| TaskFailure::execution(e.to_string()))?;
            Ok(RawResult::Command(output))
        }
        .boxed()
    }

    fn validate<'a>(
        &'a self,
        env: &'a TaskEnv,
        raw: &'a RawResult,
    ) -> BoxFuture<'a, Result<String, TaskFailure>> {
        async move {
            let RawResult::Command(output) = raw else {
                return Err(TaskFailure::execution("unexpected result kind for command task"));
            };
            if output.timed_out {
                return Err(TaskFailure::execution(format!(
                    "command timed out after {}s",
                    self.timeout.as_secs()
                )));
            }
            self.check_exit_code(output)?;
            self.check_keywords(output)?;
            for file in &self.config.expected_files {
                self.check_expected_file(env, file).await?;
            }
            Ok(match output.exit_code {
                Some(code) => format!("command succeeded (exit code {code})"),
                None => "command succeeded".to_string(),
            })
        }
        .boxed()
    }

    fn export_context(&self, env: &TaskEnv, raw: &RawResult) -> Result<Map<String, Value>, TaskFailure> {
        let RawResult::Command(output) = raw else {
            return Ok(Map::new());
        };
        let mut exported = Map::new();
        exported.insert("exit_code".into(), json!(output.exit_code));
        exported.insert("stdout".into(), json!(output.stdout.trim()));

        if self.config.exports.is_empty() {
            return Ok(exported);
        }
        let result = json!({
            "stdout": output.stdout.trim(),
            "stderr": output.stderr.trim(),
            "exit_code": output.exit_code,
        });
        let bindings = merge_params(&result, &self.spec.params);
        for (name, value) in &self.config.exports {
            let value = match value {
                Value::String(template) => {
                    let rendered = env.renderer.render(template, &bindings).map_err(|e| {
                        TaskFailure::configuration(format!("export '{name}': {e}"))
                    })?;
                    Value::String(rendered.trim().to_string())
                }
                other => other.clone(),
            };
            exported.insert(name.clone(), value);
        }
        Ok(exported)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
