use chrono::{DateTime, Utc};
use thiserror::Error;

/// Malformed workflow definition or config. Fatal before any task runs.
#[derive(Debug, Error)]
pub enum SpecError {
    #[error("cannot read config '{path}': {message}")]
    Read { path: String, message: String },

    #[error("cannot parse config: {0}")]
    Parse(String),

    #[error("workflow has no tasks")]
    NoTasks,

    #[error("task #{index} has an empty name")]
    EmptyName { index: usize },

    #[error("duplicate task name '{0}'")]
    DuplicateName(String),

    #[error("task '{task}': unknown task type '{tag}'")]
    UnknownType { task: String, tag: String },

    #[error("task '{task}': {message}")]
    InvalidTask { task: String, message: String },

    #[error("unknown task '{0}'")]
    UnknownTask(String),

    #[error("invalid workflow id '{0}': only [A-Za-z0-9_.-] allowed")]
    InvalidId(String),
}

/// Errors from the persisted state store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("state I/O error: {0}")]
    Io(String),

    #[error("corrupt state file '{path}': {message}")]
    Corrupt { path: String, message: String },

    #[error("state serialization error: {0}")]
    Serialize(String),
}

/// Errors from the cross-process lock.
#[derive(Debug, Error)]
pub enum LockError {
    #[error("workflow '{identity}' is locked by live process {pid} since {since}")]
    Contention {
        identity: String,
        pid: u32,
        since: DateTime<Utc>,
    },

    #[error("lock I/O error: {0}")]
    Io(String),

    #[error("corrupt lock file '{path}': {message}")]
    Corrupt { path: String, message: String },
}
