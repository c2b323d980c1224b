//! Run report and process exit codes.

use serde::Serialize;
use uuid::Uuid;
use yawe_types::state::{TaskStatus, WorkflowState, WorkflowStatus};

/// Every task succeeded.
pub const EXIT_SUCCESS: i32 = 0;
/// The run completed (degraded or halted) with at least one failed task.
pub const EXIT_TASK_FAILURE: i32 = 1;
/// Engine-fatal error: bad definition, lock contention, resume mismatch.
pub const EXIT_FATAL: i32 = 2;
/// Interrupted by the operator (SIGINT).
pub const EXIT_INTERRUPTED: i32 = 130;

/// Final status of one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskSummary {
    pub name: String,
    pub task_type: String,
    pub status: TaskStatus,
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// The task that stopped a run under `stop_on_first_error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HaltInfo {
    pub task: String,
    pub message: String,
}

/// Outcome of [`WorkflowEngine::run`](super::engine::WorkflowEngine::run).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub identity: String,
    pub run_id: Uuid,
    pub status: WorkflowStatus,
    pub tasks: Vec<TaskSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub halted_by: Option<HaltInfo>,
}

impl RunReport {
    pub fn from_state(state: &WorkflowState, halted_by: Option<HaltInfo>) -> Self {
        Self {
            identity: state.identity.clone(),
            run_id: state.run_id,
            status: state.status,
            tasks: state
                .tasks
                .iter()
                .map(|t| TaskSummary {
                    name: t.name.clone(),
                    task_type: t.task_type.clone(),
                    status: t.status,
                    attempts: t.attempt_count,
                    message: t.message.clone(),
                })
                .collect(),
            halted_by,
        }
    }

    pub fn failed_tasks(&self) -> impl Iterator<Item = &TaskSummary> {
        self.tasks.iter().filter(|t| t.status == TaskStatus::Failed)
    }

    pub fn exit_code(&self) -> i32 {
        if self.status == WorkflowStatus::Success {
            EXIT_SUCCESS
        } else {
            EXIT_TASK_FAILURE
        }
    }
}
