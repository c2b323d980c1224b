//! JSON file implementation of `StateStore`.
//!
//! One file per workflow identity: `{dir}/workflow_state_{identity}.json`.
//! Writes go to a temporary file in the same directory and are renamed into
//! place, so readers only ever see a complete record.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use yawe_core::repository::state::StateStore;
use yawe_types::error::StoreError;
use yawe_types::state::{WorkflowState, WorkflowStatus};

const FILE_PREFIX: &str = "workflow_state_";
const FILE_SUFFIX: &str = ".json";

#[derive(Debug, Clone)]
pub struct JsonStateStore {
    dir: PathBuf,
}

impl JsonStateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the state file for `identity`.
    pub fn path_for(&self, identity: &str) -> PathBuf {
        self.dir.join(format!("{FILE_PREFIX}{identity}{FILE_SUFFIX}"))
    }

    async fn read_state(path: &Path) -> Result<Option<WorkflowState>, StoreError> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::Io(format!("{}: {e}", path.display()))),
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| StoreError::Corrupt {
                path: path.display().to_string(),
                message: e.to_string(),
            })
    }

    async fn state_files(&self) -> Result<Vec<PathBuf>, StoreError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::Io(format!("{}: {e}", self.dir.display()))),
        };
        let mut paths = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::Io(e.to_string()))?
        {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with(FILE_PREFIX) && name.ends_with(FILE_SUFFIX) {
                paths.push(entry.path());
            }
        }
        paths.sort();
        Ok(paths)
    }
}

impl StateStore for JsonStateStore {
    async fn load(&self, identity: &str) -> Result<Option<WorkflowState>, StoreError> {
        Self::read_state(&self.path_for(identity)).await
    }

    async fn save(&self, state: &WorkflowState) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| StoreError::Io(format!("{}: {e}", self.dir.display())))?;

        let json = serde_json::to_string_pretty(state).map_err(|e| StoreError::Serialize(e.to_string()))?;
        let path = self.path_for(&state.identity);
        let tmp_path = self.dir.join(format!(
            ".{FILE_PREFIX}{}.{}.tmp",
            state.identity,
            std::process::id()
        ));

        tokio::fs::write(&tmp_path, json.as_bytes())
            .await
            .map_err(|e| StoreError::Io(format!("failed to write {}: {e}", tmp_path.display())))?;
        if let Err(e) = tokio::fs::rename(&tmp_path, &path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(StoreError::Io(format!(
                "failed to rename {} to {}: {e}",
                tmp_path.display(),
                path.display()
            )));
        }
        Ok(())
    }

    async fn reset(&self, identity: &str) -> Result<bool, StoreError> {
        let path = self.path_for(identity);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::Io(format!("{}: {e}", path.display()))),
        }
    }

    async fn list(&self) -> Result<Vec<WorkflowState>, StoreError> {
        let mut states = Vec::new();
        for path in self.state_files().await? {
            match Self::read_state(&path).await {
                Ok(Some(state)) => states.push(state),
                Ok(None) => {}
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "skipping unreadable state file"),
            }
        }
        Ok(states)
    }

    async fn prune(&self, older_than: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut removed = 0;
        for state in self.list().await? {
            if state.status == WorkflowStatus::Success && state.updated_at < older_than {
                if self.reset(&state.identity).await? {
                    tracing::info!(identity = %state.identity, updated_at = %state.updated_at, "pruned old workflow state");
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
