//! Retry policy for task execution.
//!
//! Attempt 1 runs immediately. After a retryable failure the policy waits a
//! fixed `interval` and tries again while `attempt <= max_retries`, so a task
//! that always fails is attempted `max_retries + 1` times. Configuration
//! failures end the task on the spot.

use std::time::Duration;

use serde_json::{Map, Value};
use yawe_types::workflow::RetryConfig;

use crate::task::{Task, TaskEnv, TaskFailure};

// ---------------------------------------------------------------------------
// TaskOutcome
// ---------------------------------------------------------------------------

/// Terminal result of running a task through the policy.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome {
    Success {
        message: String,
        exports: Map<String, Value>,
        attempts: u32,
    },
    Failure {
        failure: TaskFailure,
        attempts: u32,
    },
}

impl TaskOutcome {
    pub fn attempts(&self) -> u32 {
        match self {
            TaskOutcome::Success { attempts, .. } | TaskOutcome::Failure { attempts, .. } => *attempts,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TaskOutcome::Success { .. })
    }
}

// ---------------------------------------------------------------------------
// RetryPolicy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub interval: Duration,
}

impl RetryPolicy {
    /// A single attempt, no retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            interval: Duration::ZERO,
        }
    }

    pub fn from_config(config: Option<&RetryConfig>) -> Self {
        match config {
            Some(c) => Self {
                max_retries: c.max_retries,
                interval: Duration::from_secs(c.retry_interval_secs),
            },
            None => Self::none(),
        }
    }

    /// Whether another attempt follows a failed `attempt` (1-based).
    pub fn should_retry(&self, failure: &TaskFailure, attempt: u32) -> bool {
        failure.is_retryable() && attempt <= self.max_retries
    }

    /// Drive `task` to a terminal outcome: `execute` + `validate` per attempt,
    /// then `export_context` once the attempt succeeds.
    ///
    /// `prepare` must already have been called.
    pub async fn run(&self, task: &dyn Task, env: &TaskEnv) -> TaskOutcome {
        let mut attempt = 0;
        loop {
            attempt += 1;
            tracing::debug!(task = task.name(), attempt, "starting attempt");

            let result = match task.execute(env).await {
                Ok(raw) => match task.validate(env, &raw).await {
                    Ok(message) => task
                        .export_context(env, &raw)
                        .map(|exports| (message, exports)),
                    Err(failure) => Err(failure),
                },
                Err(failure) => Err(failure),
            };

            let failure = match result {
                Ok((message, exports)) => {
                    return TaskOutcome::Success {
                        message,
                        exports,
                        attempts: attempt,
                    };
                }
                Err(failure) => failure,
            };

            if !self.should_retry(&failure, attempt) {
                return TaskOutcome::Failure {
                    failure,
                    attempts: attempt,
                };
            }

            tracing::warn!(
                task = task.name(),
                attempt,
                max_attempts = self.max_retries + 1,
                retry_in_secs = self.interval.as_secs(),
                error = %failure.message,
                "attempt failed, retrying"
            );
            tokio::time::sleep(self.interval).await;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
