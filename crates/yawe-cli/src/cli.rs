//! Command-line definition for the `workflow-run` binary.

use std::path::PathBuf;

use clap::Parser;
use yawe_types::state::RunMode;

/// Run a resumable multi-step workflow.
///
/// Without flags the workflow runs from the beginning. Progress is saved
/// after every task, so a failed or interrupted run can be continued with
/// `--resume` or restarted at a given task with `--from-task`.
#[derive(Debug, Parser)]
#[command(name = "workflow-run", version, about, long_about = None)]
pub struct Cli {
    /// Config file holding settings and the workflow.
    #[arg(short, long, env = "WORKFLOW_CONFIG", default_value = "config.yaml")]
    pub config: PathBuf,

    /// Continue from the first task that has not succeeded.
    #[arg(short = 'r', long, conflicts_with = "from_task")]
    pub resume: bool,

    /// With --resume: continue a run saved before the task list was edited.
    #[arg(long, requires = "resume")]
    pub force: bool,

    /// Start at this task; earlier tasks are not run.
    #[arg(long, value_name = "NAME")]
    pub from_task: Option<String>,

    /// Delete the saved state for this workflow and exit.
    #[arg(long, conflicts_with_all = ["resume", "from_task", "clean_state", "list_tasks"])]
    pub reset: bool,

    /// Delete saved state of successfully finished workflows and exit.
    #[arg(long, conflicts_with_all = ["resume", "from_task", "list_tasks"])]
    pub clean_state: bool,

    /// With --clean-state: only states last updated more than N days ago.
    #[arg(long, value_name = "N", default_value_t = 30, requires = "clean_state")]
    pub older_than_days: u32,

    /// Print the task list with saved statuses and exit.
    #[arg(long, conflicts_with_all = ["resume", "from_task"])]
    pub list_tasks: bool,

    /// Log level (DEBUG, INFO, WARNING, ERROR). Overrides the config file.
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Export spans to stdout via OpenTelemetry.
    #[arg(long)]
    pub otel: bool,

    /// Output machine-readable JSON instead of styled text.
    #[arg(long)]
    pub json: bool,
}

/// What the invocation asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Run(RunMode),
    Reset,
    CleanState { older_than_days: u32 },
    ListTasks,
}

impl Cli {
    pub fn action(&self) -> Action {
        if self.reset {
            Action::Reset
        } else if self.clean_state {
            Action::CleanState {
                older_than_days: self.older_than_days,
            }
        } else if self.list_tasks {
            Action::ListTasks
        } else if let Some(name) = &self.from_task {
            Action::Run(RunMode::FromTask(name.clone()))
        } else if self.resume && self.force {
            Action::Run(RunMode::ForceResume)
        } else if self.resume {
            Action::Run(RunMode::Resume)
        } else {
            Action::Run(RunMode::Fresh)
        }
    }
}
