//! Execution context: exported variables propagated between tasks.
//!
//! `ExecutionContext` maps a task name to the variables that task exported on
//! success. Entries are written only after a task succeeds, so a task can see
//! exports of earlier tasks but never its own or a later task's.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use yawe_types::state::{TaskStatus, WorkflowState};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionContext {
    exports: BTreeMap<String, Map<String, Value>>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from the exports of tasks already `Success` before `until`.
    pub fn from_state(state: &WorkflowState, until: usize) -> Self {
        let mut ctx = Self::new();
        for task in state.tasks.iter().take(until) {
            if task.status == TaskStatus::Success {
                ctx.set(&task.name, task.exported_vars.clone());
            }
        }
        ctx
    }

    /// Record `task`'s exports, replacing anything it exported before.
    pub fn set(&mut self, task: &str, vars: Map<String, Value>) {
        self.exports.insert(task.to_string(), vars);
    }

    pub fn get(&self, task: &str) -> Option<&Map<String, Value>> {
        self.exports.get(task)
    }

    pub fn len(&self) -> usize {
        self.exports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exports.is_empty()
    }

    /// Bindings for the template renderer: `{task_name: {var: value}}`.
    pub fn flatten_for_template(&self) -> Value {
        Value::Object(
            self.exports
                .iter()
                .map(|(task, vars)| (task.clone(), Value::Object(vars.clone())))
                .collect(),
        )
    }
}
