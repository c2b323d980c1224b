//! Engine configuration loader.
//!
//! Reads the YAML config file and deserializes it into [`EngineConfig`].
//! Unlike optional settings files, the config carries the workflow itself,
//! so a missing or malformed file is a fatal [`SpecError`].

use std::path::Path;

use yawe_core::workflow::definition::parse_config_yaml;
use yawe_types::config::EngineConfig;
use yawe_types::error::SpecError;

/// Load and parse the engine config at `path`.
///
/// Only syntax and shape are checked here; task-level validation happens
/// when the engine is built.
pub async fn load_engine_config(path: &Path) -> Result<EngineConfig, SpecError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| SpecError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
    let config = parse_config_yaml(&content)?;
    tracing::debug!(
        path = %path.display(),
        tasks = config.workflow.tasks.len(),
        state_dir = %config.state.dir,
        "loaded engine config"
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_file_is_read_error() {
        let tmp = TempDir::new().unwrap();
        let err = load_engine_config(&tmp.path().join("config.yaml")).await.unwrap_err();
        assert!(matches!(err, SpecError::Read { .. }));
    }

    #[tokio::test]
    async fn malformed_yaml_is_parse_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.yaml");
        tokio::fs::write(&path, "workflow: [not, a, mapping").await.unwrap();
        let err = load_engine_config(&path).await.unwrap_err();
        assert!(matches!(err, SpecError::Parse(_)));
    }

    #[tokio::test]
    async fn minimal_config_gets_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.yaml");
        tokio::fs::write(
            &path,
            r#"
workflow:
  tasks:
    - name: fetch
      type: command
      executor: local
      command: "echo hi"
"#,
        )
        .await
        .unwrap();

        let config = load_engine_config(&path).await.unwrap();
        assert_eq!(config.logger.log_name, "workflow");
        assert_eq!(config.state.dir, "logs/.workflow_state");
        assert_eq!(config.tasks.command_timeout, 3600);
        assert_eq!(config.tasks.transfer.timeout, 600);
        assert!(config.notifier.is_none());
        assert!(config.workflow.settings.stop_on_first_error);
        assert_eq!(config.workflow.tasks.len(), 1);
    }

    #[tokio::test]
    async fn full_config_overrides() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.yaml");
        tokio::fs::write(
            &path,
            r#"
logger: { log_dir: /var/log/wf, log_name: nightly, level: DEBUG }
notifier: { api_url: "https://hooks.example.com/x", timeout: 5, verify_ssl: true }
state: { dir: /var/lib/wf }
tasks:
  command_timeout: 60
  transfer: { timeout: 30, compress: false }
workflow:
  id: nightly-sync
  settings: { stop_on_first_error: false }
  tasks:
    - { name: a, type: command, host: gpu01, command: "uptime" }
"#,
        )
        .await
        .unwrap();

        let config = load_engine_config(&path).await.unwrap();
        assert_eq!(config.logger.level, "DEBUG");
        let notifier = config.notifier.unwrap();
        assert_eq!(notifier.timeout, 5);
        assert!(notifier.verify_ssl);
        assert_eq!(config.state.dir, "/var/lib/wf");
        assert_eq!(config.tasks.command_timeout, 60);
        assert!(!config.tasks.transfer.compress);
        assert!(config.tasks.transfer.preserve_times);
        assert_eq!(config.workflow.id.as_deref(), Some("nightly-sync"));
        assert!(!config.workflow.settings.stop_on_first_error);
    }
}
