//! Workflow engine: sequential task execution with durable checkpointing.
//!
//! The `WorkflowEngine` runs a fixed, ordered task list to completion under a
//! cross-process lock, persisting state after every task transition so an
//! interrupted run can be resumed.
//!
//! # Execution flow
//!
//! 1. Build every task through the registry (malformed specs fail here).
//! 2. Acquire the concurrency guard for the workflow identity (fail fast).
//! 3. Prepare state for the run mode (fresh / resume / from-task) and rebuild
//!    the execution context from earlier successes.
//! 4. For each task from the start point not already Success: checkpoint
//!    Running, render, run through the retry policy, checkpoint the terminal
//!    status, merge exports, notify.
//! 5. Apply the stop/continue policy on failure, persist the overall status,
//!    release the guard.

use std::sync::Arc;

use serde_json::{Value, json};
use yawe_types::error::{LockError, SpecError, StoreError};
use yawe_types::state::{RunMode, TaskStatus, WorkflowState, WorkflowStatus};
use yawe_types::workflow::{NotifyEvent, TaskSpec, WorkflowDefinition};

use crate::repository::lock::CrossProcessLock;
use crate::repository::state::StateStore;
use crate::task::registry::TaskRegistry;
use crate::task::{Task, TaskEnv};

use super::checkpoint::{CheckpointError, CheckpointManager, PreparedRun};
use super::context::ExecutionContext;
use super::definition::{validate_definition, workflow_identity};
use super::guard::ConcurrencyGuard;
use super::report::{EXIT_FATAL, HaltInfo, RunReport};
use super::retry::{RetryPolicy, TaskOutcome};

// ---------------------------------------------------------------------------
// WorkflowEngine
// ---------------------------------------------------------------------------

/// Sequential workflow engine.
///
/// Generic over `S: StateStore` and `L: CrossProcessLock` for storage and
/// locking flexibility.
pub struct WorkflowEngine<S: StateStore, L: CrossProcessLock> {
    definition: WorkflowDefinition,
    identity: String,
    registry: TaskRegistry,
    env: TaskEnv,
    checkpoint: CheckpointManager<S>,
    guard: ConcurrencyGuard<L>,
}

impl<S: StateStore, L: CrossProcessLock> WorkflowEngine<S, L> {
    /// Validate `definition` against `registry` and derive its identity.
    pub fn new(
        definition: WorkflowDefinition,
        registry: TaskRegistry,
        env: TaskEnv,
        store: S,
        lock: L,
    ) -> Result<Self, EngineError> {
        Self::with_lock(definition, registry, env, store, Arc::new(lock))
    }

    /// Like [`new`](Self::new) with a shared lock.
    pub fn with_lock(
        definition: WorkflowDefinition,
        registry: TaskRegistry,
        env: TaskEnv,
        store: S,
        lock: Arc<L>,
    ) -> Result<Self, EngineError> {
        validate_definition(&definition, &registry, &env.defaults)?;
        let identity = workflow_identity(&definition)?;
        Ok(Self {
            definition,
            identity,
            registry,
            env,
            checkpoint: CheckpointManager::new(store),
            guard: ConcurrencyGuard::from_arc(lock),
        })
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn definition(&self) -> &WorkflowDefinition {
        &self.definition
    }

    pub fn store(&self) -> &S {
        self.checkpoint.store()
    }

    /// Persisted state for this workflow, if any.
    pub async fn persisted_state(&self) -> Result<Option<WorkflowState>, EngineError> {
        Ok(self.checkpoint.store().load(&self.identity).await?)
    }

    /// Delete the persisted state under the lock. Returns `true` if it existed.
    pub async fn reset(&self) -> Result<bool, EngineError> {
        let _guard = self.guard.acquire(&self.identity)?;
        let removed = self.checkpoint.store().reset(&self.identity).await?;
        tracing::info!(identity = %self.identity, removed, "reset workflow state");
        Ok(removed)
    }

    // -----------------------------------------------------------------------
    // Run
    // -----------------------------------------------------------------------

    /// Run the workflow in `mode`.
    ///
    /// Task failures are reported in the returned [`RunReport`]; only
    /// engine-fatal conditions are errors.
    pub async fn run(&self, mode: RunMode) -> Result<RunReport, EngineError> {
        let mut tasks = self.build_tasks()?;

        // Held for the whole run; dropping it on any exit path releases the lock.
        let _guard = self.guard.acquire(&self.identity)?;

        let PreparedRun { mut state, start, .. } =
            self.checkpoint.prepare(&self.identity, &self.definition, &mode).await?;
        let mut ctx = ExecutionContext::from_state(&state, start);

        tracing::info!(
            identity = %self.identity,
            run_id = %state.run_id,
            mode = %mode,
            start,
            tasks = tasks.len(),
            restored = ctx.len(),
            "starting workflow run"
        );

        if start >= tasks.len() {
            tracing::info!(identity = %self.identity, "all tasks already succeeded, nothing to run");
            state.status = WorkflowStatus::Success;
            self.checkpoint.persist(&mut state).await?;
            return Ok(RunReport::from_state(&state, None));
        }

        state.status = WorkflowStatus::Running;
        self.checkpoint.persist(&mut state).await?;

        let stop_on_first_error = self.definition.settings.stop_on_first_error;
        let mut halted_by: Option<HaltInfo> = None;

        for (index, task) in tasks.iter_mut().enumerate().skip(start) {
            let spec = task.spec().clone();

            // Kept from an earlier run: never re-run, exports stay visible to later tasks.
            if state.tasks[index].status == TaskStatus::Success {
                tracing::info!(task = %spec.name, index, "task already succeeded, keeping result");
                ctx.set(&spec.name, state.tasks[index].exported_vars.clone());
                continue;
            }

            if let Some(halt) = &halted_by {
                let message = format!("skipped: workflow halted by '{}'", halt.task);
                self.checkpoint
                    .checkpoint_task_finished(&mut state, index, TaskStatus::Skipped, 0, Some(message))
                    .await?;
                continue;
            }

            if !spec.enabled {
                tracing::info!(task = %spec.name, index, "task disabled, skipping");
                self.checkpoint
                    .checkpoint_task_finished(
                        &mut state,
                        index,
                        TaskStatus::Skipped,
                        0,
                        Some("skipped: task disabled".to_string()),
                    )
                    .await?;
                continue;
            }

            self.checkpoint.checkpoint_task_start(&mut state, index).await?;
            tracing::info!(task = %spec.name, index, task_type = %spec.task_type, "running task");

            let outcome = self.run_task(task.as_mut(), &spec, &ctx).await;

            match outcome {
                TaskOutcome::Success { message, exports, attempts } => {
                    state.tasks[index].exported_vars = exports.clone();
                    ctx.set(&spec.name, exports);
                    self.checkpoint
                        .checkpoint_task_finished(
                            &mut state,
                            index,
                            TaskStatus::Success,
                            attempts,
                            Some(message.clone()),
                        )
                        .await?;
                    tracing::info!(task = %spec.name, attempts, message = %message, "task succeeded");
                    if spec.notify_on_success {
                        self.notify_task(&spec, NotifyEvent::Success, &message).await;
                    }
                }
                TaskOutcome::Failure { failure, attempts } => {
                    self.checkpoint
                        .checkpoint_task_finished(
                            &mut state,
                            index,
                            TaskStatus::Failed,
                            attempts,
                            Some(failure.message.clone()),
                        )
                        .await?;
                    tracing::error!(
                        task = %spec.name,
                        attempts,
                        kind = %failure.kind,
                        error = %failure.message,
                        "task failed"
                    );
                    if spec.notify_on_failure {
                        self.notify_task(&spec, NotifyEvent::Failure, &failure.message).await;
                    }

                    if stop_on_first_error && spec.fail_on_error {
                        tracing::error!(task = %spec.name, "stopping workflow at first error");
                        halted_by = Some(HaltInfo {
                            task: spec.name.clone(),
                            message: failure.message,
                        });
                    } else {
                        tracing::warn!(
                            task = %spec.name,
                            fail_on_error = spec.fail_on_error,
                            "continuing after task failure"
                        );
                    }
                }
            }
        }

        state.status = if state.any_failed() {
            WorkflowStatus::Failed
        } else {
            WorkflowStatus::Success
        };
        self.checkpoint.persist(&mut state).await?;

        tracing::info!(
            identity = %self.identity,
            run_id = %state.run_id,
            status = %state.status,
            "workflow run finished"
        );
        Ok(RunReport::from_state(&state, halted_by))
    }

    fn build_tasks(&self) -> Result<Vec<Box<dyn Task>>, SpecError> {
        self.definition
            .tasks
            .iter()
            .map(|spec| self.registry.build(spec, &self.env.defaults))
            .collect()
    }

    /// Render and run one task through its retry policy.
    async fn run_task(&self, task: &mut dyn Task, spec: &TaskSpec, ctx: &ExecutionContext) -> TaskOutcome {
        let bindings = ctx.flatten_for_template();
        if let Err(failure) = task.prepare(&self.env, &bindings) {
            return TaskOutcome::Failure { failure, attempts: 1 };
        }
        RetryPolicy::from_config(spec.retry.as_ref())
            .run(task, &self.env)
            .await
    }

    /// Send a task notification. Notifier problems never affect task status.
    async fn notify_task(&self, spec: &TaskSpec, event: NotifyEvent, message: &str) {
        let Some(notifier) = &self.env.notifier else {
            tracing::debug!(task = %spec.name, "no notifier configured, skipping notification");
            return;
        };

        let error_message = if event == NotifyEvent::Failure { message } else { "" };
        let bindings = json!({
            "task_name": spec.name,
            "message": message,
            "error_message": error_message,
        });
        let template = spec.notification.for_event(event);
        let title = self.render_or(
            template.and_then(|t| t.title.as_deref()),
            &bindings,
            format!("Task {event}: {}", spec.name),
        );
        let body = self.render_or(
            template.and_then(|t| t.message.as_deref()),
            &bindings,
            message.to_string(),
        );

        if let Err(e) = notifier.notify(event, &title, &body).await {
            tracing::warn!(task = %spec.name, event = %event, error = %e, "failed to send notification");
        }
    }

    fn render_or(&self, template: Option<&str>, bindings: &Value, fallback: String) -> String {
        let Some(template) = template else {
            return fallback;
        };
        match self.env.renderer.render(template, bindings) {
            Ok(rendered) => rendered,
            Err(e) => {
                tracing::warn!(error = %e, "notification template failed, using default text");
                fallback
            }
        }
    }
}

// ---------------------------------------------------------------------------
// EngineError
// ---------------------------------------------------------------------------

/// Engine-fatal errors. Task failures are never reported through this type.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Malformed workflow definition.
    #[error("invalid workflow definition: {0}")]
    Spec(#[from] SpecError),

    /// Another live process holds the lock for this workflow.
    #[error("workflow '{identity}' is already running (pid {pid}, since {since})")]
    LockContention {
        identity: String,
        pid: u32,
        since: chrono::DateTime<chrono::Utc>,
    },

    /// Persisted state does not match the current definition.
    #[error("cannot resume: {0}; reset the workflow state first")]
    ResumeStateMismatch(String),

    #[error("state store error: {0}")]
    Store(#[from] StoreError),

    #[error("lock error: {0}")]
    Lock(LockError),
}

impl EngineError {
    pub fn exit_code(&self) -> i32 {
        EXIT_FATAL
    }
}

impl From<LockError> for EngineError {
    fn from(e: LockError) -> Self {
        match e {
            LockError::Contention { identity, pid, since } => {
                EngineError::LockContention { identity, pid, since }
            }
            other => EngineError::Lock(other),
        }
    }
}

impl From<CheckpointError> for EngineError {
    fn from(e: CheckpointError) -> Self {
        match e {
            CheckpointError::Store(e) => EngineError::Store(e),
            CheckpointError::Mismatch(message) => EngineError::ResumeStateMismatch(message),
            CheckpointError::UnknownTask(name) => EngineError::Spec(SpecError::UnknownTask(name)),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        DottedRenderer, EchoExecutor, MemoryLock, MemoryStore, MockTransfer, RecordingNotifier,
    };
    use yawe_types::config::TaskDefaults;
    use crate::workflow::definition::parse_workflow_yaml;
    use crate::workflow::report::{EXIT_SUCCESS, EXIT_TASK_FAILURE};
    use yawe_types::state::LockRecord;

    struct Harness {
        executor: EchoExecutor,
        store: MemoryStore,
        lock: Arc<MemoryLock>,
        notifier: RecordingNotifier,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                executor: EchoExecutor::default(),
                store: MemoryStore::default(),
                lock: Arc::new(MemoryLock::default()),
                notifier: RecordingNotifier::default(),
            }
        }

        fn engine(&self, yaml: &str) -> WorkflowEngine<MemoryStore, MemoryLock> {
            let env = TaskEnv {
                executor: Arc::new(self.executor.clone()),
                transfer: Arc::new(MockTransfer::default()),
                renderer: Arc::new(DottedRenderer),
                notifier: Some(Arc::new(self.notifier.clone())),
                defaults: TaskDefaults::default(),
            };
            WorkflowEngine::with_lock(
                parse_workflow_yaml(yaml).unwrap(),
                TaskRegistry::with_builtins(),
                env,
                self.store.clone(),
                Arc::clone(&self.lock),
            )
            .unwrap()
        }
    }

    fn statuses(report: &RunReport) -> Vec<TaskStatus> {
        report.tasks.iter().map(|t| t.status).collect()
    }

    const THREE: &str = r#"
id: three
tasks:
  - {name: fetch, type: command, executor: local, command: fetch}
  - {name: process, type: command, executor: local, command: process}
  - {name: verify, type: command, executor: local, command: verify}
"#;

    #[tokio::test]
    async fn all_success() {
        let h = Harness::new();
        let engine = h.engine(THREE);
        let report = engine.run(RunMode::Fresh).await.unwrap();

        assert_eq!(report.exit_code(), EXIT_SUCCESS);
        assert_eq!(report.status, WorkflowStatus::Success);
        assert!(report.tasks.iter().all(|t| t.status == TaskStatus::Success));
        assert_eq!(h.executor.commands(), vec!["fetch", "process", "verify"]);
        assert!(h.lock.holder("three").is_none());
    }

    #[tokio::test]
    async fn state_is_persisted_after_every_transition() {
        let h = Harness::new();
        h.engine(THREE).run(RunMode::Fresh).await.unwrap();

        let saves = h.store.saves.lock().unwrap();
        // initial + (running, finished) per task + final
        assert_eq!(saves.len(), 1 + 3 * 2 + 1);
        for save in saves.iter() {
            let running = save.tasks.iter().filter(|t| t.status == TaskStatus::Running).count();
            assert!(running <= 1);
        }
    }

    #[tokio::test]
    async fn stop_on_first_error_skips_remaining() {
        let h = Harness::new();
        let yaml = THREE.replace("command: process", "command: FAIL");
        let report = h.engine(&yaml).run(RunMode::Fresh).await.unwrap();

        use TaskStatus::*;
        assert_eq!(statuses(&report), vec![Success, Failed, Skipped]);
        assert_eq!(report.exit_code(), EXIT_TASK_FAILURE);
        assert_eq!(report.halted_by.as_ref().unwrap().task, "process");
        assert_eq!(h.executor.count("verify"), 0);
    }

    #[tokio::test]
    async fn continue_on_error_runs_later_tasks() {
        let h = Harness::new();
        let yaml = THREE
            .replace("command: process", "command: FAIL")
            .replace("id: three", "id: three\nsettings: {stop_on_first_error: false}");
        let report = h.engine(&yaml).run(RunMode::Fresh).await.unwrap();

        use TaskStatus::*;
        assert_eq!(statuses(&report), vec![Success, Failed, Success]);
        assert_eq!(report.status, WorkflowStatus::Failed);
        assert!(report.halted_by.is_none());
        assert_eq!(report.exit_code(), EXIT_TASK_FAILURE);
    }

    #[tokio::test]
    async fn fail_on_error_false_never_halts() {
        let h = Harness::new();
        let yaml = THREE.replace(
            "{name: process, type: command, executor: local, command: process}",
            "{name: process, type: command, executor: local, command: FAIL, fail_on_error: false}",
        );
        let report = h.engine(&yaml).run(RunMode::Fresh).await.unwrap();
        assert_eq!(report.tasks[2].status, TaskStatus::Success);
        assert_eq!(report.status, WorkflowStatus::Failed);
    }

    #[tokio::test]
    async fn resume_runs_only_unfinished_tasks() {
        let h = Harness::new();
        let failing = THREE.replace("command: process", "command: FAIL");
        h.engine(&failing).run(RunMode::Fresh).await.unwrap();

        // Same identity (explicit id), fixed command.
        let report = h.engine(THREE).run(RunMode::Resume).await.unwrap();
        assert_eq!(report.exit_code(), EXIT_SUCCESS);
        assert_eq!(h.executor.count("fetch"), 1);
        assert_eq!(h.executor.count("process"), 1);
        assert_eq!(h.executor.count("verify"), 1);
    }

    #[tokio::test]
    async fn resume_keeps_success_after_a_failed_task() {
        let h = Harness::new();
        let yaml = |process: &str, summary: &str| {
            format!(
                r#"
id: gaps
settings: {{stop_on_first_error: false}}
tasks:
  - {{name: fetch, type: command, executor: local, command: fetch}}
  - {{name: process, type: command, executor: local, command: {process}}}
  - {{name: verify, type: command, executor: local, command: verify}}
  - {{name: summary, type: command, executor: local, command_template: "{summary}"}}
"#
            )
        };

        let first = h
            .engine(&yaml("FAIL", "FAIL"))
            .run(RunMode::Fresh)
            .await
            .unwrap();
        use TaskStatus::*;
        assert_eq!(statuses(&first), vec![Success, Failed, Success, Failed]);

        let report = h
            .engine(&yaml("process", "sum {{ verify.stdout }}"))
            .run(RunMode::Resume)
            .await
            .unwrap();
        assert_eq!(report.exit_code(), EXIT_SUCCESS);
        assert_eq!(statuses(&report), vec![Success, Success, Success, Success]);
        assert_eq!(h.executor.count("fetch"), 1);
        assert_eq!(h.executor.count("verify"), 1);
        assert_eq!(h.executor.count("process"), 1);
        assert_eq!(h.executor.count("sum verify"), 1);
    }

    #[tokio::test]
    async fn resume_when_everything_succeeded_runs_nothing() {
        let h = Harness::new();
        h.engine(THREE).run(RunMode::Fresh).await.unwrap();
        let report = h.engine(THREE).run(RunMode::Resume).await.unwrap();
        assert_eq!(report.exit_code(), EXIT_SUCCESS);
        assert_eq!(h.executor.commands().len(), 3);
    }

    #[tokio::test]
    async fn from_task_reruns_named_task_and_later() {
        let h = Harness::new();
        h.engine(THREE).run(RunMode::Fresh).await.unwrap();
        let report = h
            .engine(THREE)
            .run(RunMode::FromTask("process".into()))
            .await
            .unwrap();
        assert_eq!(report.exit_code(), EXIT_SUCCESS);
        assert_eq!(h.executor.count("fetch"), 1);
        assert_eq!(h.executor.count("process"), 2);
        assert_eq!(h.executor.count("verify"), 2);
    }

    #[tokio::test]
    async fn from_unknown_task_is_spec_error() {
        let h = Harness::new();
        let err = h
            .engine(THREE)
            .run(RunMode::FromTask("nope".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Spec(SpecError::UnknownTask(_))));
        assert_eq!(err.exit_code(), EXIT_FATAL);
    }

    #[tokio::test]
    async fn contention_leaves_state_untouched() {
        let h = Harness::new();
        h.lock.plant(LockRecord {
            identity: "three".into(),
            pid: 4242,
            acquired_at: chrono::Utc::now(),
        });
        let err = h.engine(THREE).run(RunMode::Fresh).await.unwrap_err();
        assert!(matches!(err, EngineError::LockContention { pid: 4242, .. }));
        assert_eq!(h.store.save_count(), 0);
        assert!(h.executor.commands().is_empty());
    }

    #[tokio::test]
    async fn resume_mismatch_is_fatal() {
        let h = Harness::new();
        h.engine(THREE).run(RunMode::Fresh).await.unwrap();
        let two = "id: three\ntasks:\n  - {name: fetch, type: command, executor: local, command: fetch}\n";
        let err = h.engine(two).run(RunMode::Resume).await.unwrap_err();
        assert!(matches!(err, EngineError::ResumeStateMismatch(_)));
        assert!(h.lock.holder("three").is_none());
    }

    #[tokio::test]
    async fn exports_flow_forward_only() {
        let h = Harness::new();
        let yaml = r#"
id: exports
tasks:
  - name: fetch
    type: command
    executor: local
    command: abc
  - name: use
    type: command
    executor: local
    command_template: "got {{ fetch.stdout }}"
"#;
        let report = h.engine(yaml).run(RunMode::Fresh).await.unwrap();
        assert_eq!(report.exit_code(), EXIT_SUCCESS);
        assert_eq!(h.executor.commands(), vec!["abc", "got abc"]);
    }

    #[tokio::test]
    async fn referencing_a_later_export_fails_without_retry() {
        let h = Harness::new();
        let yaml = r#"
id: forward
tasks:
  - name: early
    type: command
    executor: local
    command_template: "echo {{ late.stdout }}"
    retry: {max_retries: 3, retry_interval: 0}
  - name: late
    type: command
    executor: local
    command: late
"#;
        let report = h.engine(yaml).run(RunMode::Fresh).await.unwrap();
        assert_eq!(report.tasks[0].status, TaskStatus::Failed);
        assert_eq!(report.tasks[0].attempts, 1);
        assert_eq!(report.tasks[1].status, TaskStatus::Skipped);
        assert!(h.executor.commands().is_empty());
    }

    #[tokio::test]
    async fn disabled_task_is_skipped() {
        let h = Harness::new();
        let yaml = THREE.replace(
            "command: process}",
            "command: process, enabled: false}",
        );
        let report = h.engine(&yaml).run(RunMode::Fresh).await.unwrap();
        assert_eq!(report.tasks[1].status, TaskStatus::Skipped);
        assert_eq!(report.status, WorkflowStatus::Success);
        assert_eq!(h.executor.count("process"), 0);
    }

    #[tokio::test]
    async fn retries_are_counted() {
        let h = Harness::new();
        let yaml = "id: r\ntasks:\n  - {name: a, type: command, executor: local, command: FAIL, retry: {max_retries: 3, retry_interval: 0}}\n";
        let report = h.engine(yaml).run(RunMode::Fresh).await.unwrap();
        assert_eq!(report.tasks[0].attempts, 4);
        assert_eq!(h.executor.count("FAIL"), 4);
    }

    #[tokio::test]
    async fn failure_notification_uses_templates() {
        let h = Harness::new();
        let yaml = r#"
id: notify
tasks:
  - name: deploy
    type: command
    executor: local
    command: FAIL
    notify_on_failure: true
    notification:
      failure:
        title: "{{ task_name }} broke"
"#;
        h.engine(yaml).run(RunMode::Fresh).await.unwrap();
        let sent = h.notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, NotifyEvent::Failure);
        assert_eq!(sent[0].1, "deploy broke");
        assert!(sent[0].2.contains("exit code 1"));
    }

    #[tokio::test]
    async fn notifier_failure_does_not_change_status() {
        let mut h = Harness::new();
        h.notifier.fail = true;
        let yaml = "id: n\ntasks:\n  - {name: a, type: command, executor: local, command: ok, notify_on_success: true}\n";
        let report = h.engine(yaml).run(RunMode::Fresh).await.unwrap();
        assert_eq!(report.exit_code(), EXIT_SUCCESS);
    }

    #[tokio::test]
    async fn reset_removes_state() {
        let h = Harness::new();
        let engine = h.engine(THREE);
        engine.run(RunMode::Fresh).await.unwrap();
        assert!(engine.persisted_state().await.unwrap().is_some());
        assert!(engine.reset().await.unwrap());
        assert!(engine.persisted_state().await.unwrap().is_none());
    }

    #[test]
    fn invalid_definition_is_rejected_at_construction() {
        let h = Harness::new();
        let env = TaskEnv {
            executor: Arc::new(h.executor.clone()),
            transfer: Arc::new(MockTransfer::default()),
            renderer: Arc::new(DottedRenderer),
            notifier: None,
            defaults: TaskDefaults::default(),
        };
        let def = parse_workflow_yaml("tasks:\n  - {name: a, type: warp}\n").unwrap();
        let result = WorkflowEngine::new(
            def,
            TaskRegistry::with_builtins(),
            env,
            MemoryStore::default(),
            MemoryLock::default(),
        );
        assert!(matches!(result, Err(EngineError::Spec(SpecError::UnknownType { .. }))));
    }
}
