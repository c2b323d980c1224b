//! Lock-file implementation of `CrossProcessLock`.
//!
//! A lock is a JSON [`LockRecord`] at `{dir}/{identity}.lock`. Creation is
//! atomic: the record is written to a private temp file which is then
//! hard-linked onto the lock path. `link(2)` fails if the target exists, so
//! exactly one process wins and nobody can observe a half-written record.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use yawe_core::repository::lock::CrossProcessLock;
use yawe_types::error::LockError;
use yawe_types::state::LockRecord;

#[derive(Debug, Clone)]
pub struct FileLock {
    dir: PathBuf,
}

impl FileLock {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, identity: &str) -> PathBuf {
        self.dir.join(format!("{identity}.lock"))
    }

    fn read_path(path: &Path) -> Result<Option<LockRecord>, LockError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(LockError::Io(format!("{}: {e}", path.display()))),
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| LockError::Corrupt {
                path: path.display().to_string(),
                message: e.to_string(),
            })
    }

    /// Remove the lock file if it still holds exactly `record`.
    fn remove_if_matches(&self, record: &LockRecord) -> Result<bool, LockError> {
        let path = self.path_for(&record.identity);
        match Self::read_path(&path)? {
            Some(current) if current == *record => match std::fs::remove_file(&path) {
                Ok(()) => Ok(true),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
                Err(e) => Err(LockError::Io(format!("{}: {e}", path.display()))),
            },
            _ => Ok(false),
        }
    }
}

impl CrossProcessLock for FileLock {
    fn try_acquire(&self, identity: &str) -> Result<LockRecord, LockError> {
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| LockError::Io(format!("{}: {e}", self.dir.display())))?;

        let record = LockRecord::for_current_process(identity);
        let json = serde_json::to_string(&record).map_err(|e| LockError::Io(e.to_string()))?;

        let path = self.path_for(identity);
        let tmp_path = self
            .dir
            .join(format!(".{identity}.lock.{}.tmp", record.pid));
        if let Err(e) = std::fs::write(&tmp_path, json.as_bytes()) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(LockError::Io(format!("failed to write {}: {e}", tmp_path.display())));
        }

        let linked = std::fs::hard_link(&tmp_path, &path);
        let _ = std::fs::remove_file(&tmp_path);

        match linked {
            Ok(()) => Ok(record),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                let holder = Self::read_path(&path)?;
                Err(LockError::Contention {
                    identity: identity.to_string(),
                    pid: holder.as_ref().map_or(0, |h| h.pid),
                    since: holder.map_or_else(chrono::Utc::now, |h| h.acquired_at),
                })
            }
            Err(e) => Err(LockError::Io(format!(
                "failed to create {}: {e}",
                path.display()
            ))),
        }
    }

    fn read(&self, identity: &str) -> Result<Option<LockRecord>, LockError> {
        Self::read_path(&self.path_for(identity))
    }

    fn release(&self, record: &LockRecord) -> Result<(), LockError> {
        if !self.remove_if_matches(record)? {
            tracing::debug!(identity = %record.identity, "lock no longer ours, leaving it");
        }
        Ok(())
    }

    fn is_stale(&self, record: &LockRecord) -> bool {
        !is_pid_alive(record.pid)
    }

    fn break_stale(&self, record: &LockRecord) -> Result<bool, LockError> {
        self.remove_if_matches(record)
    }
}

// ---------------------------------------------------------------------------
// Process liveness
// ---------------------------------------------------------------------------

#[cfg(unix)]
fn is_pid_alive(pid: u32) -> bool {
    if pid == 0 {
        return false;
    }
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return false;
    };
    // kill(pid, 0) probes for existence without sending a signal.
    // EPERM means the process exists but belongs to someone else.
    let rc = unsafe { libc::kill(pid, 0) };
    rc == 0 || std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

#[cfg(not(unix))]
fn is_pid_alive(pid: u32) -> bool {
    pid != 0
}
