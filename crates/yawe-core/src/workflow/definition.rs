//! Workflow definition parsing, validation and identity.
//!
//! Converts YAML into the `EngineConfig` / `WorkflowDefinition` types,
//! validates structural constraints (non-empty unique names, known type tags,
//! well-formed type-specific keys) and derives the workflow identity that keys
//! persisted state and the lock.

use std::collections::HashSet;

use sha2::{Digest, Sha256};
use yawe_types::config::{EngineConfig, TaskDefaults};
use yawe_types::error::SpecError;
use yawe_types::workflow::WorkflowDefinition;

use crate::task::registry::TaskRegistry;

/// Number of hex characters kept from the content hash.
const IDENTITY_HEX_LEN: usize = 16;

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse a full config file.
pub fn parse_config_yaml(yaml: &str) -> Result<EngineConfig, SpecError> {
    serde_yaml_ng::from_str(yaml).map_err(|e| SpecError::Parse(e.to_string()))
}

/// Parse a bare workflow definition (the `workflow:` section on its own).
pub fn parse_workflow_yaml(yaml: &str) -> Result<WorkflowDefinition, SpecError> {
    serde_yaml_ng::from_str(yaml).map_err(|e| SpecError::Parse(e.to_string()))
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate structural constraints on a `WorkflowDefinition`.
///
/// Checks:
/// - At least one task exists
/// - Task names are non-empty and unique
/// - An explicit id only uses filename-safe characters
/// - Every type tag is registered and its constructor accepts the task's keys
pub fn validate_definition(
    def: &WorkflowDefinition,
    registry: &TaskRegistry,
    defaults: &TaskDefaults,
) -> Result<(), SpecError> {
    if def.tasks.is_empty() {
        return Err(SpecError::NoTasks);
    }

    if let Some(id) = &def.id {
        let valid = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid {
            return Err(SpecError::InvalidId(id.clone()));
        }
    }

    let mut seen = HashSet::new();
    for (index, task) in def.tasks.iter().enumerate() {
        if task.name.trim().is_empty() {
            return Err(SpecError::EmptyName { index });
        }
        if !seen.insert(task.name.as_str()) {
            return Err(SpecError::DuplicateName(task.name.clone()));
        }
        registry.build(task, defaults)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Identity keying persisted state and the lock.
///
/// The explicit `id` when set, otherwise the first 16 hex characters of the
/// SHA-256 of the task list's canonical JSON. Editing any task therefore
/// yields a new identity and a fresh state record.
pub fn workflow_identity(def: &WorkflowDefinition) -> Result<String, SpecError> {
    if let Some(id) = &def.id {
        return Ok(id.clone());
    }
    // serde_json::Map is ordered by key, so this encoding is stable.
    let value = serde_json::to_value(&def.tasks).map_err(|e| SpecError::Parse(e.to_string()))?;
    let canonical = serde_json::to_string(&value).map_err(|e| SpecError::Parse(e.to_string()))?;
    let digest = format!("{:x}", Sha256::digest(canonical.as_bytes()));
    Ok(digest[..IDENTITY_HEX_LEN].to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_TASKS: &str = r#"
tasks:
  - name: fetch
    type: command
    executor: local
    command: "curl example.org"
  - name: verify
    type: command
    executor: local
    command: "test -s out"
"#;

    fn validate(yaml: &str) -> Result<(), SpecError> {
        let def = parse_workflow_yaml(yaml)?;
        validate_definition(&def, &TaskRegistry::with_builtins(), &TaskDefaults::default())
    }

    #[test]
    fn valid_definition_passes() {
        validate(TWO_TASKS).unwrap();
    }

    #[test]
    fn empty_task_list_rejected() {
        assert!(matches!(validate("tasks: []\n"), Err(SpecError::NoTasks)));
    }

    #[test]
    fn duplicate_names_rejected() {
        let yaml = "tasks:\n  - {name: a, type: command, executor: local, command: x}\n  - {name: a, type: command, executor: local, command: y}\n";
        assert!(matches!(validate(yaml), Err(SpecError::DuplicateName(n)) if n == "a"));
    }

    #[test]
    fn empty_name_rejected() {
        let yaml = "tasks:\n  - {name: '', type: command, executor: local, command: x}\n";
        assert!(matches!(validate(yaml), Err(SpecError::EmptyName { index: 0 })));
    }

    #[test]
    fn unknown_type_rejected() {
        let yaml = "tasks:\n  - {name: a, type: ftp}\n";
        assert!(matches!(validate(yaml), Err(SpecError::UnknownType { .. })));
    }

    #[test]
    fn missing_required_key_rejected() {
        let yaml = "tasks:\n  - {name: a, type: command, executor: local}\n";
        assert!(matches!(validate(yaml), Err(SpecError::InvalidTask { .. })));
    }

    #[test]
    fn explicit_id_must_be_filename_safe() {
        let yaml = "id: ../escape\ntasks:\n  - {name: a, type: command, executor: local, command: x}\n";
        assert!(matches!(validate(yaml), Err(SpecError::InvalidId(_))));
    }

    #[test]
    fn malformed_yaml_is_parse_error() {
        assert!(matches!(parse_config_yaml("workflow: [\n"), Err(SpecError::Parse(_))));
    }

    #[test]
    fn identity_is_stable_and_content_derived() {
        let a = parse_workflow_yaml(TWO_TASKS).unwrap();
        let b = parse_workflow_yaml(TWO_TASKS).unwrap();
        let id = workflow_identity(&a).unwrap();
        assert_eq!(id.len(), 16);
        assert_eq!(id, workflow_identity(&b).unwrap());

        let changed = parse_workflow_yaml(&TWO_TASKS.replace("test -s out", "test -f out")).unwrap();
        assert_ne!(id, workflow_identity(&changed).unwrap());
    }

    #[test]
    fn explicit_identity_wins() {
        let mut def = parse_workflow_yaml(TWO_TASKS).unwrap();
        def.id = Some("nightly-sync".into());
        assert_eq!(workflow_identity(&def).unwrap(), "nightly-sync");
    }
}
