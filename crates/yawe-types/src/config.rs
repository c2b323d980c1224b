//! Engine configuration types.
//!
//! `EngineConfig` is the top-level YAML config file: logger, notifier, state
//! directory, per-task defaults and the workflow itself. Every section except
//! `workflow` has sensible defaults.

use serde::{Deserialize, Serialize};

use crate::workflow::WorkflowDefinition;

/// Top-level configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub logger: LoggerConfig,
    /// Outbound notification endpoint. Absent disables notifications.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notifier: Option<NotifierConfig>,
    #[serde(default)]
    pub state: StateConfig,
    /// Defaults applied to every task.
    #[serde(default)]
    pub tasks: TaskDefaults,
    pub workflow: WorkflowDefinition,
}

// ---------------------------------------------------------------------------
// Logger
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggerConfig {
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
    #[serde(default = "default_log_name")]
    pub log_name: String,
    /// Level name (`DEBUG`, `INFO`, ...), case-insensitive.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
            log_name: default_log_name(),
            level: default_log_level(),
        }
    }
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_log_name() -> String {
    "workflow".to_string()
}

fn default_log_level() -> String {
    "INFO".to_string()
}

// ---------------------------------------------------------------------------
// Notifier
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifierConfig {
    pub api_url: String,
    /// Request timeout in seconds.
    #[serde(default = "default_notifier_timeout")]
    pub timeout: u64,
    #[serde(default)]
    pub verify_ssl: bool,
}

fn default_notifier_timeout() -> u64 {
    10
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateConfig {
    /// Directory holding state and lock files.
    #[serde(default = "default_state_dir")]
    pub dir: String,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            dir: default_state_dir(),
        }
    }
}

fn default_state_dir() -> String {
    "logs/.workflow_state".to_string()
}

// ---------------------------------------------------------------------------
// Task defaults
// ---------------------------------------------------------------------------

/// Defaults for every task, overridable per task spec.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDefaults {
    /// Command timeout in seconds.
    #[serde(default = "default_command_timeout")]
    pub command_timeout: u64,
    #[serde(default = "default_local_shell")]
    pub local_shell: String,
    #[serde(default)]
    pub transfer: TransferDefaults,
}

impl Default for TaskDefaults {
    fn default() -> Self {
        Self {
            command_timeout: default_command_timeout(),
            local_shell: default_local_shell(),
            transfer: TransferDefaults::default(),
        }
    }
}

fn default_command_timeout() -> u64 {
    3600
}

fn default_local_shell() -> String {
    "/bin/sh".to_string()
}

/// Transfer defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferDefaults {
    /// Transfer timeout in seconds.
    #[serde(default = "default_transfer_timeout")]
    pub timeout: u64,
    /// Enable rsync/scp wire compression.
    #[serde(default = "default_true")]
    pub compress: bool,
    #[serde(default = "default_true")]
    pub preserve_times: bool,
    #[serde(default)]
    pub show_progress: bool,
    /// Unpack pre-compressed archives on the receiving side.
    #[serde(default = "default_true")]
    pub decompress: bool,
    #[serde(default = "default_temp_dir")]
    pub remote_temp_dir: String,
    #[serde(default = "default_temp_dir")]
    pub local_temp_dir: String,
}

impl Default for TransferDefaults {
    fn default() -> Self {
        Self {
            timeout: default_transfer_timeout(),
            compress: true,
            preserve_times: true,
            show_progress: false,
            decompress: true,
            remote_temp_dir: default_temp_dir(),
            local_temp_dir: default_temp_dir(),
        }
    }
}

fn default_transfer_timeout() -> u64 {
    600
}

fn default_temp_dir() -> String {
    "/tmp".to_string()
}

fn default_true() -> bool {
    true
}
