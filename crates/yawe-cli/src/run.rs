//! Wiring of concrete adapters and dispatch of the requested action.

use std::sync::Arc;

use anyhow::{Context, Result};
use yawe_core::exec::Notifier;
use yawe_core::repository::state::StateStore;
use yawe_core::task::TaskEnv;
use yawe_core::task::registry::TaskRegistry;
use yawe_core::workflow::engine::{EngineError, WorkflowEngine};
use yawe_core::workflow::report::{EXIT_FATAL, EXIT_INTERRUPTED, EXIT_SUCCESS};
use yawe_infra::filesystem::{FileLock, JsonStateStore};
use yawe_infra::notify::HttpNotifier;
use yawe_infra::process::{ProcessExecutor, RsyncTransfer};
use yawe_infra::template::MinijinjaRenderer;
use yawe_types::config::EngineConfig;
use yawe_types::state::RunMode;

use crate::cli::Action;
use crate::report;

type Engine = WorkflowEngine<JsonStateStore, FileLock>;

/// Collaborators for every task, built from config.
pub fn build_env(config: &EngineConfig) -> Result<TaskEnv> {
    let notifier: Option<Arc<dyn Notifier>> = match &config.notifier {
        Some(nc) => Some(Arc::new(
            HttpNotifier::new(nc).context("failed to set up notifier")?,
        )),
        None => None,
    };
    Ok(TaskEnv {
        executor: Arc::new(ProcessExecutor::new()),
        transfer: Arc::new(RsyncTransfer::new(config.tasks.transfer.clone())),
        renderer: Arc::new(MinijinjaRenderer::new()),
        notifier,
        defaults: config.tasks.clone(),
    })
}

pub fn build_engine(config: &EngineConfig, env: TaskEnv) -> Result<Engine, EngineError> {
    WorkflowEngine::new(
        config.workflow.clone(),
        TaskRegistry::with_builtins(),
        env,
        JsonStateStore::new(&config.state.dir),
        FileLock::new(&config.state.dir),
    )
}

/// Perform `action` and return the process exit code.
pub async fn execute(action: Action, config: &EngineConfig, json: bool) -> Result<i32> {
    match action {
        Action::CleanState { older_than_days } => clean_state(config, older_than_days, json).await,
        Action::Run(mode) => match open_engine(config)? {
            Ok(engine) => run(&engine, mode, json).await,
            Err(e) => Ok(fatal(&e, json)),
        },
        Action::Reset => match open_engine(config)? {
            Ok(engine) => reset(&engine, json).await,
            Err(e) => Ok(fatal(&e, json)),
        },
        Action::ListTasks => match open_engine(config)? {
            Ok(engine) => list_tasks(&engine, json).await,
            Err(e) => Ok(fatal(&e, json)),
        },
    }
}

/// Adapter setup failures are errors; a definition the engine rejects is
/// returned as the inner `EngineError` so it maps to the fatal exit code.
fn open_engine(config: &EngineConfig) -> Result<Result<Engine, EngineError>> {
    let env = build_env(config)?;
    Ok(build_engine(config, env))
}

async fn reset(engine: &Engine, json: bool) -> Result<i32> {
    match engine.reset().await {
        Ok(removed) => {
            let message = if removed {
                format!("Removed saved state for workflow '{}'.", engine.identity())
            } else {
                format!("No saved state for workflow '{}'.", engine.identity())
            };
            report::print_notice(
                &message,
                json,
                serde_json::json!({ "identity": engine.identity(), "removed": removed }),
            );
            Ok(EXIT_SUCCESS)
        }
        Err(e) => Ok(fatal(&e, json)),
    }
}

async fn list_tasks(engine: &Engine, json: bool) -> Result<i32> {
    match engine.persisted_state().await {
        Ok(state) => {
            report::print_task_list(engine.definition(), engine.identity(), state.as_ref(), json)?;
            Ok(EXIT_SUCCESS)
        }
        Err(e) => Ok(fatal(&e, json)),
    }
}

async fn run(engine: &Engine, mode: RunMode, json: bool) -> Result<i32> {
    // Dropping the run future on Ctrl-C drops the lock guard and any running
    // child process with it.
    tokio::select! {
        result = engine.run(mode) => match result {
            Ok(run_report) => {
                report::print_report(&run_report, json)?;
                Ok(run_report.exit_code())
            }
            Err(e) => Ok(fatal(&e, json)),
        },
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!(identity = %engine.identity(), "interrupted, progress so far is saved");
            report::print_error("interrupted; continue with --resume", json);
            Ok(EXIT_INTERRUPTED)
        }
    }
}

async fn clean_state(config: &EngineConfig, older_than_days: u32, json: bool) -> Result<i32> {
    let store = JsonStateStore::new(&config.state.dir);
    let cutoff = chrono::Utc::now() - chrono::Duration::days(i64::from(older_than_days));
    match store.prune(cutoff).await {
        Ok(removed) => {
            report::print_notice(
                &format!("Removed {removed} finished workflow state(s) older than {older_than_days} days."),
                json,
                serde_json::json!({ "removed": removed, "older_than_days": older_than_days }),
            );
            Ok(EXIT_SUCCESS)
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to clean state");
            report::print_error(&e.to_string(), json);
            Ok(EXIT_FATAL)
        }
    }
}

fn fatal(err: &EngineError, json: bool) -> i32 {
    tracing::error!(error = %err, "workflow aborted");
    report::print_error(&err.to_string(), json);
    err.exit_code()
}
