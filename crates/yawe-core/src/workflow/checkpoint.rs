//! Durable checkpoint manager for workflow execution state.
//!
//! Wraps a `StateStore` with the run-mode rules: which persisted state a run
//! starts from, where in the task list it begins, and the shape check that
//! refuses to resume a state written for a different task list. Every state
//! transition is persisted before the engine moves forward.

use yawe_types::error::StoreError;
use yawe_types::state::{STATE_SCHEMA_VERSION, RunMode, TaskStatus, WorkflowState, WorkflowStatus};
use yawe_types::workflow::WorkflowDefinition;

use crate::repository::state::StateStore;

// ---------------------------------------------------------------------------
// PreparedRun
// ---------------------------------------------------------------------------

/// The state a run starts from.
#[derive(Debug, Clone)]
pub struct PreparedRun {
    pub state: WorkflowState,
    /// Index of the first task the run may execute.
    pub start: usize,
    /// Whether `state` was loaded from the store.
    pub loaded: bool,
}

// ---------------------------------------------------------------------------
// CheckpointManager
// ---------------------------------------------------------------------------

/// Manages durable execution checkpoints for workflow runs.
///
/// Generic over `S: StateStore` so it works with any storage backend (JSON
/// files, in-memory mock, etc.).
pub struct CheckpointManager<S: StateStore> {
    store: S,
}

impl<S: StateStore> CheckpointManager<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Access the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Build the starting state for `mode`.
    pub async fn prepare(
        &self,
        identity: &str,
        def: &WorkflowDefinition,
        mode: &RunMode,
    ) -> Result<PreparedRun, CheckpointError> {
        match mode {
            RunMode::Fresh => Ok(PreparedRun {
                state: WorkflowState::new(identity, def),
                start: 0,
                loaded: false,
            }),
            RunMode::Resume | RunMode::ForceResume => {
                let state = match self.load_verified(identity, def).await? {
                    Some(state) => Some(state),
                    None => {
                        let adopt = matches!(mode, RunMode::ForceResume);
                        self.orphaned_state(identity, def, adopt).await?
                    }
                };
                let Some(mut state) = state else {
                    tracing::warn!(identity, "no persisted state to resume, starting fresh");
                    return Ok(PreparedRun {
                        state: WorkflowState::new(identity, def),
                        start: 0,
                        loaded: false,
                    });
                };
                let start = state.first_incomplete().unwrap_or(state.tasks.len());
                for task in state.tasks.iter_mut().skip(start) {
                    if task.status != TaskStatus::Success {
                        task.reset();
                    }
                }
                state.stop_on_first_error = def.settings.stop_on_first_error;
                tracing::info!(identity, start, "resuming from persisted state");
                Ok(PreparedRun {
                    state,
                    start,
                    loaded: true,
                })
            }
            RunMode::FromTask(name) => {
                let start = def
                    .tasks
                    .iter()
                    .position(|t| &t.name == name)
                    .ok_or_else(|| CheckpointError::UnknownTask(name.clone()))?;
                let (mut state, loaded) = match self.load_verified(identity, def).await? {
                    Some(state) => (state, true),
                    None => (WorkflowState::new(identity, def), false),
                };
                for task in state.tasks.iter_mut().take(start) {
                    if task.status != TaskStatus::Success {
                        task.reset();
                        task.status = TaskStatus::Skipped;
                        task.message = Some(format!("skipped: run started at task '{name}'"));
                    }
                }
                for task in state.tasks.iter_mut().skip(start) {
                    task.reset();
                }
                state.stop_on_first_error = def.settings.stop_on_first_error;
                tracing::info!(identity, task = %name, start, "starting from task");
                Ok(PreparedRun { state, start, loaded })
            }
        }
    }

    /// Load the persisted state and check it matches `def`.
    async fn load_verified(
        &self,
        identity: &str,
        def: &WorkflowDefinition,
    ) -> Result<Option<WorkflowState>, CheckpointError> {
        match self.store.load(identity).await? {
            Some(state) => {
                verify_shape(&state, identity, def)?;
                Ok(Some(state))
            }
            None => Ok(None),
        }
    }

    /// Latest unfinished state saved under another identity whose task list
    /// still lines up with `def`. Only taken over when `adopt` is set;
    /// otherwise its existence is reported and `None` returned.
    async fn orphaned_state(
        &self,
        identity: &str,
        def: &WorkflowDefinition,
        adopt: bool,
    ) -> Result<Option<WorkflowState>, CheckpointError> {
        let candidate = self
            .store
            .list()
            .await?
            .into_iter()
            .filter(|s| s.identity != identity)
            .filter(|s| matches!(s.status, WorkflowStatus::Failed | WorkflowStatus::Running))
            .filter(|s| verify_tasks(s, def).is_ok())
            .max_by_key(|s| s.updated_at);
        let Some(mut state) = candidate else {
            return Ok(None);
        };

        if !adopt {
            tracing::warn!(
                identity,
                saved_as = %state.identity,
                updated_at = %state.updated_at,
                "an unfinished run of these tasks was saved before the workflow changed; \
                 resume with --force to continue it"
            );
            return Ok(None);
        }

        let previous = std::mem::replace(&mut state.identity, identity.to_string());
        self.store.save(&state).await?;
        self.store.reset(&previous).await?;
        tracing::warn!(identity, previous = %previous, "adopted state saved before the workflow changed");
        Ok(Some(state))
    }

    /// Stamp `updated_at` and write the state.
    pub async fn persist(&self, state: &mut WorkflowState) -> Result<(), StoreError> {
        state.touch();
        self.store.save(state).await?;
        tracing::debug!(
            identity = %state.identity,
            status = %state.status,
            "checkpointed workflow state"
        );
        Ok(())
    }

    /// Checkpoint a task as running (Pending -> Running).
    pub async fn checkpoint_task_start(
        &self,
        state: &mut WorkflowState,
        index: usize,
    ) -> Result<(), StoreError> {
        if let Some(task) = state.tasks.get_mut(index) {
            task.status = TaskStatus::Running;
            task.started_at = Some(chrono::Utc::now());
            task.finished_at = None;
            task.message = None;
        }
        state.status = WorkflowStatus::Running;
        self.persist(state).await
    }

    /// Checkpoint a task's terminal status.
    pub async fn checkpoint_task_finished(
        &self,
        state: &mut WorkflowState,
        index: usize,
        status: TaskStatus,
        attempts: u32,
        message: Option<String>,
    ) -> Result<(), StoreError> {
        if let Some(task) = state.tasks.get_mut(index) {
            task.status = status;
            task.attempt_count = attempts;
            task.message = message;
            task.finished_at = Some(chrono::Utc::now());
        }
        self.persist(state).await
    }
}

// ---------------------------------------------------------------------------
// Shape verification
// ---------------------------------------------------------------------------

/// Check a persisted state against the current definition.
///
/// The task list must match 1:1 in length, order, name and type tag.
pub fn verify_shape(
    state: &WorkflowState,
    identity: &str,
    def: &WorkflowDefinition,
) -> Result<(), CheckpointError> {
    if state.identity != identity {
        return Err(CheckpointError::Mismatch(format!(
            "state belongs to workflow '{}', not '{identity}'",
            state.identity
        )));
    }
    verify_tasks(state, def)
}

/// Schema version and task list checks, ignoring identity.
fn verify_tasks(state: &WorkflowState, def: &WorkflowDefinition) -> Result<(), CheckpointError> {
    if state.version != STATE_SCHEMA_VERSION {
        return Err(CheckpointError::Mismatch(format!(
            "state schema version {} (expected {STATE_SCHEMA_VERSION})",
            state.version
        )));
    }
    if state.tasks.len() != def.tasks.len() {
        return Err(CheckpointError::Mismatch(format!(
            "state has {} tasks, definition has {}",
            state.tasks.len(),
            def.tasks.len()
        )));
    }
    for (index, (persisted, spec)) in state.tasks.iter().zip(&def.tasks).enumerate() {
        if persisted.name != spec.name || persisted.task_type != spec.task_type {
            return Err(CheckpointError::Mismatch(format!(
                "task #{index} is '{}' ({}) in state but '{}' ({}) in definition",
                persisted.name, persisted.task_type, spec.name, spec.task_type
            )));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// CheckpointError
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("persisted state does not match the workflow: {0}")]
    Mismatch(String),

    #[error("unknown task '{0}'")]
    UnknownTask(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
