//! Task abstraction and built-in task types.
//!
//! A task is one unit of work. The engine drives every task through the same
//! lifecycle: `prepare` (render templates against the current bindings),
//! `execute` (call the collaborator), `validate` (apply the task's success
//! rules to the raw result) and, on success, `export_context`.
//!
//! Expected failures (nonzero exit, timeout, failed rule) are `TaskFailure`
//! values, never Rust errors or panics.

pub mod command;
pub mod notification;
pub mod registry;
pub mod transfer;

use std::fmt;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde_json::{Map, Value};
use yawe_types::config::TaskDefaults;
use yawe_types::workflow::TaskSpec;

use crate::exec::{
    CommandExecutor, CommandOutput, FileTransfer, Notifier, TemplateRenderer, TransferReport,
};

// ---------------------------------------------------------------------------
// TaskEnv
// ---------------------------------------------------------------------------

/// Collaborators and defaults handed to every task.
#[derive(Clone)]
pub struct TaskEnv {
    pub executor: Arc<dyn CommandExecutor>,
    pub transfer: Arc<dyn FileTransfer>,
    pub renderer: Arc<dyn TemplateRenderer>,
    pub notifier: Option<Arc<dyn Notifier>>,
    pub defaults: TaskDefaults,
}

// ---------------------------------------------------------------------------
// TaskFailure
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Nonzero exit, timeout, failed validation rule.
    Execution,
    /// Transfer-specific execution failure.
    Transfer,
    /// Missing or unrenderable configuration. Never retried.
    Configuration,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Execution => write!(f, "execution"),
            FailureKind::Transfer => write!(f, "transfer"),
            FailureKind::Configuration => write!(f, "configuration"),
        }
    }
}

/// An expected task failure with its classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl TaskFailure {
    pub fn execution(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Execution,
            message: message.into(),
        }
    }

    pub fn transfer(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Transfer,
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Configuration,
            message: message.into(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind != FailureKind::Configuration
    }
}

impl fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failure: {}", self.kind, self.message)
    }
}

// ---------------------------------------------------------------------------
// RawResult
// ---------------------------------------------------------------------------

/// What a collaborator call produced, before validation.
#[derive(Debug, Clone, PartialEq)]
pub enum RawResult {
    Command(CommandOutput),
    Transfer(TransferReport),
    Message(String),
}

// ---------------------------------------------------------------------------
// Task trait
// ---------------------------------------------------------------------------

/// A unit of work driven by the engine.
///
/// Object-safe so the registry can hand out `Box<dyn Task>` for any type tag.
pub trait Task: Send + Sync {
    /// The static definition this task was built from.
    fn spec(&self) -> &TaskSpec;

    fn name(&self) -> &str {
        &self.spec().name
    }

    /// Render templates against `bindings` (execution context plus params).
    ///
    /// Called once per run before the first attempt. Failures here are
    /// configuration failures.
    fn prepare(&mut self, env: &TaskEnv, bindings: &Value) -> Result<(), TaskFailure>;

    /// Perform one attempt.
    fn execute<'a>(&'a self, env: &'a TaskEnv) -> BoxFuture<'a, Result<RawResult, TaskFailure>>;

    /// Apply success rules to the attempt's result. Returns the success message.
    fn validate<'a>(
        &'a self,
        env: &'a TaskEnv,
        raw: &'a RawResult,
    ) -> BoxFuture<'a, Result<String, TaskFailure>>;

    /// Variables published to later tasks. Called only after a successful
    /// `validate`.
    fn export_context(&self, _env: &TaskEnv, _raw: &RawResult) -> Result<Map<String, Value>, TaskFailure> {
        Ok(Map::new())
    }
}

/// Merge `params` over `bindings` (params win). Both must be JSON objects.
pub fn merge_params(bindings: &Value, params: &Map<String, Value>) -> Value {
    let mut merged = match bindings {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };
    for (key, value) in params {
        merged.insert(key.clone(), value.clone());
    }
    Value::Object(merged)
}
