//! Persisted execution state.
//!
//! `WorkflowState` is the durable checkpoint of a run: one `TaskState` per
//! task spec, in the same order, plus the overall status. It is written after
//! every task transition and read back on resume.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::workflow::WorkflowDefinition;

/// Schema version written into every persisted state record.
pub const STATE_SCHEMA_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Task State
// ---------------------------------------------------------------------------

/// Status of a single task within a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    Running,
    Success,
    Failed,
    Skipped,
}

impl TaskStatus {
    /// Whether this status ends the task's lifecycle for the current run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Success | TaskStatus::Failed | TaskStatus::Skipped)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::Running => write!(f, "running"),
            TaskStatus::Success => write!(f, "success"),
            TaskStatus::Failed => write!(f, "failed"),
            TaskStatus::Skipped => write!(f, "skipped"),
        }
    }
}

/// Runtime record of one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskState {
    pub name: String,
    pub task_type: String,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub attempt_count: u32,
    /// Variables produced by the task on success.
    #[serde(default)]
    pub exported_vars: Map<String, Value>,
    /// Last result or failure message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl TaskState {
    pub fn pending(name: impl Into<String>, task_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            task_type: task_type.into(),
            status: TaskStatus::Pending,
            attempt_count: 0,
            exported_vars: Map::new(),
            message: None,
            started_at: None,
            finished_at: None,
        }
    }

    /// Return the task to `Pending`, clearing everything from previous runs.
    pub fn reset(&mut self) {
        self.status = TaskStatus::Pending;
        self.attempt_count = 0;
        self.exported_vars.clear();
        self.message = None;
        self.started_at = None;
        self.finished_at = None;
    }
}

// ---------------------------------------------------------------------------
// Workflow State
// ---------------------------------------------------------------------------

/// Overall status of a workflow run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    #[default]
    Pending,
    Running,
    Success,
    Failed,
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkflowStatus::Pending => write!(f, "pending"),
            WorkflowStatus::Running => write!(f, "running"),
            WorkflowStatus::Success => write!(f, "success"),
            WorkflowStatus::Failed => write!(f, "failed"),
        }
    }
}

/// The complete persisted checkpoint of a workflow run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowState {
    /// Schema version (see [`STATE_SCHEMA_VERSION`]).
    pub version: u32,
    /// Workflow identity this state belongs to.
    pub identity: String,
    /// UUIDv7 of the run that created this record.
    pub run_id: Uuid,
    #[serde(default)]
    pub status: WorkflowStatus,
    #[serde(default = "default_true")]
    pub stop_on_first_error: bool,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// One entry per task spec, same order.
    pub tasks: Vec<TaskState>,
}

impl WorkflowState {
    /// Fresh state with every task `Pending`.
    pub fn new(identity: impl Into<String>, definition: &WorkflowDefinition) -> Self {
        let now = Utc::now();
        Self {
            version: STATE_SCHEMA_VERSION,
            identity: identity.into(),
            run_id: Uuid::now_v7(),
            status: WorkflowStatus::Pending,
            stop_on_first_error: definition.settings.stop_on_first_error,
            started_at: now,
            updated_at: now,
            tasks: definition
                .tasks
                .iter()
                .map(|t| TaskState::pending(&t.name, &t.task_type))
                .collect(),
        }
    }

    pub fn task(&self, name: &str) -> Option<&TaskState> {
        self.tasks.iter().find(|t| t.name == name)
    }

    /// Index of the first task not yet `Success`.
    pub fn first_incomplete(&self) -> Option<usize> {
        self.tasks.iter().position(|t| t.status != TaskStatus::Success)
    }

    pub fn all_succeeded(&self) -> bool {
        self.tasks.iter().all(|t| t.status == TaskStatus::Success)
    }

    pub fn any_failed(&self) -> bool {
        self.tasks.iter().any(|t| t.status == TaskStatus::Failed)
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

// ---------------------------------------------------------------------------
// Run Mode
// ---------------------------------------------------------------------------

/// How the engine treats previously persisted state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunMode {
    /// Ignore persisted state; every task starts `Pending`.
    Fresh,
    /// Continue at the first task not already `Success`.
    Resume,
    /// Like `Resume`, but when nothing is saved under the current identity,
    /// adopt the latest unfinished state whose task names and types still
    /// line up (the task list was edited since it was saved).
    ForceResume,
    /// Begin at the named task regardless of its prior status.
    FromTask(String),
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::Fresh => write!(f, "fresh"),
            RunMode::Resume => write!(f, "resume"),
            RunMode::ForceResume => write!(f, "resume(force)"),
            RunMode::FromTask(name) => write!(f, "from-task({name})"),
        }
    }
}

// ---------------------------------------------------------------------------
// Lock Record
// ---------------------------------------------------------------------------

/// Contents of a lock file: who holds exclusive execution rights.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockRecord {
    pub identity: String,
    pub pid: u32,
    pub acquired_at: DateTime<Utc>,
}

impl LockRecord {
    /// Record for the current process.
    pub fn for_current_process(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            pid: std::process::id(),
            acquired_at: Utc::now(),
        }
    }
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::WorkflowDefinition;

    fn definition() -> WorkflowDefinition {
        serde_yaml_ng::from_str(
            "tasks:\n  - {name: fetch, type: command, command: a}\n  - {name: verify, type: command, command: b}\n",
        )
        .unwrap()
    }

    #[test]
    fn new_state_is_all_pending() {
        let state = WorkflowState::new("abc", &definition());
        assert_eq!(state.version, STATE_SCHEMA_VERSION);
        assert_eq!(state.tasks.len(), 2);
        assert!(state.tasks.iter().all(|t| t.status == TaskStatus::Pending));
        assert_eq!(state.first_incomplete(), Some(0));
        assert!(state.stop_on_first_error);
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&TaskStatus::Skipped).unwrap();
        assert_eq!(json, "\"skipped\"");
        let back: TaskStatus = serde_json::from_str("\"running\"").unwrap();
        assert_eq!(back, TaskStatus::Running);
    }

    #[test]
    fn reset_clears_previous_run() {
        let mut task = TaskState::pending("fetch", "command");
        task.status = TaskStatus::Failed;
        task.attempt_count = 4;
        task.message = Some("boom".into());
        task.exported_vars.insert("k".into(), Value::from(1));
        task.reset();
        assert_eq!(task, TaskState::pending("fetch", "command"));
    }

    #[test]
    fn first_incomplete_skips_successes() {
        let mut state = WorkflowState::new("abc", &definition());
        state.tasks[0].status = TaskStatus::Success;
        assert_eq!(state.first_incomplete(), Some(1));
        state.tasks[1].status = TaskStatus::Success;
        assert_eq!(state.first_incomplete(), None);
        assert!(state.all_succeeded());
    }
}
