//! Workflow definition types.
//!
//! A `WorkflowDefinition` is an ordered, fixed list of `TaskSpec`s plus a few
//! workflow-level settings. Task specs carry the keys common to every task
//! type; type-specific keys stay in `TaskSpec::options` and are decoded by the
//! task type's constructor into one of the typed configs below.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// Workflow Definition
// ---------------------------------------------------------------------------

/// The declarative workflow: settings plus tasks in execution order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    /// Explicit workflow identity. When absent the identity is derived from
    /// the task list content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Workflow-level settings.
    #[serde(default)]
    pub settings: WorkflowSettings,
    /// Tasks in their fixed execution order.
    #[serde(default)]
    pub tasks: Vec<TaskSpec>,
}

/// Workflow-level execution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowSettings {
    /// Halt the run at the first task that fails terminally.
    #[serde(default = "default_true")]
    pub stop_on_first_error: bool,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            stop_on_first_error: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Task Spec
// ---------------------------------------------------------------------------

/// Static definition of a single task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSpec {
    /// Unique task name within the workflow.
    pub name: String,
    /// Dispatch tag resolved through the task registry (e.g. `command`).
    #[serde(rename = "type")]
    pub task_type: String,
    /// Disabled tasks are recorded as skipped and never run.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Where commands run.
    #[serde(default)]
    pub executor: ExecutorKind,
    /// Target host, required for the ssh executor and for transfers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// Per-task timeout in seconds (falls back to the engine defaults).
    #[serde(default, rename = "timeout", skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    /// Retry configuration. Absent means a single attempt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryConfig>,
    /// Template parameters, merged over the execution context when rendering.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub params: Map<String, Value>,
    /// When false a failure of this task never halts the workflow.
    #[serde(default = "default_true")]
    pub fail_on_error: bool,
    /// Send a notification after terminal success.
    #[serde(default)]
    pub notify_on_success: bool,
    /// Send a notification after terminal failure.
    #[serde(default)]
    pub notify_on_failure: bool,
    /// Notification title/message templates.
    #[serde(default, skip_serializing_if = "NotificationConfig::is_empty")]
    pub notification: NotificationConfig,
    /// Type-specific keys, decoded by the task type's constructor.
    #[serde(flatten)]
    pub options: Map<String, Value>,
}

impl TaskSpec {
    /// Decode the type-specific options into a typed config.
    pub fn decode_options<T: serde::de::DeserializeOwned>(&self) -> Result<T, String> {
        serde_json::from_value(Value::Object(self.options.clone())).map_err(|e| e.to_string())
    }
}

/// Where a command task executes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutorKind {
    Local,
    #[default]
    Ssh,
}

impl fmt::Display for ExecutorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutorKind::Local => write!(f, "local"),
            ExecutorKind::Ssh => write!(f, "ssh"),
        }
    }
}

// ---------------------------------------------------------------------------
// Retry Configuration
// ---------------------------------------------------------------------------

/// Retry configuration for a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries after the first attempt (default 3).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Fixed wait between attempts in seconds (default 300).
    #[serde(default = "default_retry_interval", rename = "retry_interval")]
    pub retry_interval_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_interval_secs: default_retry_interval(),
        }
    }
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_interval() -> u64 {
    300
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

/// Notification event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotifyEvent {
    Success,
    Failure,
    Warning,
}

impl fmt::Display for NotifyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotifyEvent::Success => write!(f, "success"),
            NotifyEvent::Failure => write!(f, "failure"),
            NotifyEvent::Warning => write!(f, "warning"),
        }
    }
}

impl std::str::FromStr for NotifyEvent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(NotifyEvent::Success),
            "failure" => Ok(NotifyEvent::Failure),
            "warning" => Ok(NotifyEvent::Warning),
            other => Err(format!("unknown notification type: '{other}'")),
        }
    }
}

/// Per-event notification templates for a task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<NotificationTemplate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<NotificationTemplate>,
}

impl NotificationConfig {
    pub fn is_empty(&self) -> bool {
        self.success.is_none() && self.failure.is_none()
    }

    /// Template configured for an event, if any.
    pub fn for_event(&self, event: NotifyEvent) -> Option<&NotificationTemplate> {
        match event {
            NotifyEvent::Success => self.success.as_ref(),
            NotifyEvent::Failure => self.failure.as_ref(),
            NotifyEvent::Warning => None,
        }
    }
}

/// Title and message templates. `{{ task_name }}`, `{{ message }}` and
/// `{{ error_message }}` are available.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationTemplate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

// ---------------------------------------------------------------------------
// Command task options
// ---------------------------------------------------------------------------

/// Type-specific keys of a `command` task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandTaskConfig {
    /// Literal command.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    /// Command template, preferred over `command` when both are set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_template: Option<String>,
    /// Local shell override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shell: Option<String>,
    #[serde(default = "default_true")]
    pub check_exit_code: bool,
    #[serde(default = "default_allowed_exit_codes")]
    pub allowed_exit_codes: Vec<i32>,
    #[serde(default = "default_true")]
    pub check_error_keywords: bool,
    #[serde(default = "default_error_keywords")]
    pub error_keywords: Vec<String>,
    #[serde(default)]
    pub success_keywords: Vec<String>,
    #[serde(default)]
    pub expected_files: Vec<ExpectedFile>,
    /// Variables exported after success: name -> template over
    /// `{stdout, stderr, exit_code}` and the task params.
    #[serde(default)]
    pub exports: Map<String, Value>,
}

/// An output file that must exist after the command ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedFile {
    pub path: String,
    #[serde(default = "default_true")]
    pub must_exist: bool,
    #[serde(default)]
    pub min_size: u64,
}

fn default_allowed_exit_codes() -> Vec<i32> {
    vec![0]
}

/// Keywords whose presence in command output marks the run as failed.
pub const DEFAULT_ERROR_KEYWORDS: &[&str] = &["Error:", "ERROR:", "Exception:", "Traceback", "FAILED"];

fn default_error_keywords() -> Vec<String> {
    DEFAULT_ERROR_KEYWORDS.iter().map(|k| k.to_string()).collect()
}

// ---------------------------------------------------------------------------
// Transfer task options
// ---------------------------------------------------------------------------

/// Direction of a file transfer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferDirection {
    #[default]
    RemoteToLocal,
    LocalToRemote,
}

impl fmt::Display for TransferDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferDirection::RemoteToLocal => write!(f, "remote_to_local"),
            TransferDirection::LocalToRemote => write!(f, "local_to_remote"),
        }
    }
}

/// Tool used to move the bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferMethod {
    #[default]
    Rsync,
    Scp,
}

impl fmt::Display for TransferMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferMethod::Rsync => write!(f, "rsync"),
            TransferMethod::Scp => write!(f, "scp"),
        }
    }
}

/// Type-specific keys of a `transfer` task.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransferTaskConfig {
    #[serde(default)]
    pub direction: TransferDirection,
    #[serde(default)]
    pub transfer_method: TransferMethod,
    #[serde(default)]
    pub pre_compress: bool,
    /// Falls back to the engine-wide transfer default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decompress: Option<bool>,
    #[serde(default)]
    pub items: Vec<TransferItemSpec>,
}

/// One source/destination pair. Item-level settings override task-level ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferItemSpec {
    #[serde(default, alias = "remote_path")]
    pub remote: String,
    #[serde(default, alias = "local_path")]
    pub local: String,
    #[serde(default)]
    pub recursive: bool,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<TransferMethod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_compress: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decompress: Option<bool>,
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_spec_defaults_and_options() {
        let yaml = r#"
name: build
type: command
host: worker-1
command_template: "make {{ target }}"
params:
  target: all
"#;
        let spec: TaskSpec = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(spec.name, "build");
        assert_eq!(spec.task_type, "command");
        assert!(spec.enabled);
        assert!(spec.fail_on_error);
        assert_eq!(spec.executor, ExecutorKind::Ssh);
        assert!(spec.retry.is_none());
        assert_eq!(spec.params["target"], "all");
        assert_eq!(spec.options["command_template"], "make {{ target }}");
        assert!(!spec.options.contains_key("host"));
    }

    #[test]
    fn retry_defaults() {
        let spec: TaskSpec =
            serde_yaml_ng::from_str("name: a\ntype: command\nretry: {}\n").unwrap();
        let retry = spec.retry.unwrap();
        assert_eq!(retry.max_retries, 3);
        assert_eq!(retry.retry_interval_secs, 300);
    }

    #[test]
    fn command_config_defaults() {
        let spec: TaskSpec =
            serde_yaml_ng::from_str("name: a\ntype: command\ncommand: ls\n").unwrap();
        let config: CommandTaskConfig = spec.decode_options().unwrap();
        assert_eq!(config.command.as_deref(), Some("ls"));
        assert!(config.check_exit_code);
        assert_eq!(config.allowed_exit_codes, vec![0]);
        assert!(config.error_keywords.iter().any(|k| k == "Traceback"));
        assert!(config.success_keywords.is_empty());
    }

    #[test]
    fn transfer_item_aliases() {
        let yaml = r#"
name: pull
type: transfer
host: h
direction: local_to_remote
items:
  - remote_path: /srv/out
    local_path: ./out
    method: scp
"#;
        let spec: TaskSpec = serde_yaml_ng::from_str(yaml).unwrap();
        let config: TransferTaskConfig = spec.decode_options().unwrap();
        assert_eq!(config.direction, TransferDirection::LocalToRemote);
        assert_eq!(config.items[0].remote, "/srv/out");
        assert_eq!(config.items[0].local, "./out");
        assert_eq!(config.items[0].method, Some(TransferMethod::Scp));
    }

    #[test]
    fn notify_event_parse() {
        assert_eq!("failure".parse::<NotifyEvent>().unwrap(), NotifyEvent::Failure);
        assert!("loud".parse::<NotifyEvent>().is_err());
    }
}
