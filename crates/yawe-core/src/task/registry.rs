//! Static dispatch table from task type tag to constructor.
//!
//! The table is populated before the engine is built: built-in types via
//! [`TaskRegistry::with_builtins`] plus any operator extensions registered by
//! the binary. Unknown tags are a `SpecError` at load time.

use std::collections::BTreeMap;

use yawe_types::config::TaskDefaults;
use yawe_types::error::SpecError;
use yawe_types::workflow::TaskSpec;

use super::Task;
use super::command::CommandTask;
use super::notification::NotificationTask;
use super::transfer::TransferTask;

/// Builds a task from its spec, rejecting malformed type-specific keys.
pub type TaskConstructor = fn(&TaskSpec, &TaskDefaults) -> Result<Box<dyn Task>, SpecError>;

#[derive(Clone)]
pub struct TaskRegistry {
    constructors: BTreeMap<String, TaskConstructor>,
}

impl TaskRegistry {
    /// A registry with no task types.
    pub fn empty() -> Self {
        Self {
            constructors: BTreeMap::new(),
        }
    }

    /// A registry with `command`, `transfer` and `notification`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register(CommandTask::TYPE_TAG, |spec, defaults| {
            Ok(Box::new(CommandTask::new(spec, defaults)?))
        });
        registry.register(TransferTask::TYPE_TAG, |spec, defaults| {
            Ok(Box::new(TransferTask::new(spec, defaults)?))
        });
        registry.register(NotificationTask::TYPE_TAG, |spec, defaults| {
            Ok(Box::new(NotificationTask::new(spec, defaults)?))
        });
        registry
    }

    /// Register (or replace) a constructor for `tag`.
    pub fn register(&mut self, tag: impl Into<String>, constructor: TaskConstructor) {
        let tag = tag.into();
        if self.constructors.insert(tag.clone(), constructor).is_some() {
            tracing::debug!(tag, "replaced task type constructor");
        }
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.constructors.contains_key(tag)
    }

    /// Registered type tags, sorted.
    pub fn types(&self) -> Vec<&str> {
        self.constructors.keys().map(String::as_str).collect()
    }

    /// Build the task for `spec`.
    pub fn build(&self, spec: &TaskSpec, defaults: &TaskDefaults) -> Result<Box<dyn Task>, SpecError> {
        let constructor = self
            .constructors
            .get(&spec.task_type)
            .ok_or_else(|| SpecError::UnknownType {
                task: spec.name.clone(),
                tag: spec.task_type.clone(),
            })?;
        constructor(spec, defaults)
    }
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
