//! Cross-process concurrency guard.
//!
//! Wraps a [`CrossProcessLock`] with the acquisition policy: fail fast when a
//! live owner holds the lock, reclaim it when the owner is dead. The returned
//! [`GuardHandle`] releases the lock when dropped, so every exit path of a run
//! (including fatal errors and cancellation) gives the lock back.

use std::sync::Arc;

use yawe_types::error::LockError;
use yawe_types::state::LockRecord;

use crate::repository::lock::CrossProcessLock;

/// Reclaim attempts before giving up on a lock that keeps changing hands.
const MAX_RECLAIM_ATTEMPTS: usize = 3;

pub struct ConcurrencyGuard<L: CrossProcessLock> {
    lock: Arc<L>,
}

impl<L: CrossProcessLock> Clone for ConcurrencyGuard<L> {
    fn clone(&self) -> Self {
        Self {
            lock: Arc::clone(&self.lock),
        }
    }
}

impl<L: CrossProcessLock> ConcurrencyGuard<L> {
    pub fn new(lock: L) -> Self {
        Self { lock: Arc::new(lock) }
    }

    pub fn from_arc(lock: Arc<L>) -> Self {
        Self { lock }
    }

    pub fn lock(&self) -> &L {
        &self.lock
    }

    /// Take exclusive execution rights for `identity` without blocking.
    ///
    /// Returns `LockError::Contention` when a live process holds the lock.
    pub fn acquire(&self, identity: &str) -> Result<GuardHandle<L>, LockError> {
        for _ in 0..MAX_RECLAIM_ATTEMPTS {
            match self.lock.try_acquire(identity) {
                Ok(record) => {
                    tracing::debug!(identity, pid = record.pid, "acquired workflow lock");
                    return Ok(GuardHandle {
                        lock: Arc::clone(&self.lock),
                        record: Some(record),
                    });
                }
                Err(LockError::Contention { .. }) => {
                    let Some(holder) = self.lock.read(identity)? else {
                        // Released between our attempt and the read.
                        continue;
                    };
                    if !self.is_stale(&holder) {
                        return Err(LockError::Contention {
                            identity: identity.to_string(),
                            pid: holder.pid,
                            since: holder.acquired_at,
                        });
                    }
                    tracing::warn!(
                        identity,
                        pid = holder.pid,
                        since = %holder.acquired_at,
                        "reclaiming stale workflow lock"
                    );
                    self.lock.break_stale(&holder)?;
                }
                Err(other) => return Err(other),
            }
        }

        let holder = self.lock.read(identity)?;
        Err(LockError::Contention {
            identity: identity.to_string(),
            pid: holder.as_ref().map_or(0, |h| h.pid),
            since: holder.map_or_else(chrono::Utc::now, |h| h.acquired_at),
        })
    }

    /// True if the owner recorded in `record` is no longer alive.
    pub fn is_stale(&self, record: &LockRecord) -> bool {
        self.lock.is_stale(record)
    }
}

/// Scoped ownership of a workflow lock; released on drop.
pub struct GuardHandle<L: CrossProcessLock> {
    lock: Arc<L>,
    record: Option<LockRecord>,
}

impl<L: CrossProcessLock> GuardHandle<L> {
    pub fn record(&self) -> Option<&LockRecord> {
        self.record.as_ref()
    }

    /// Release now and report errors, instead of on drop.
    pub fn release(mut self) -> Result<(), LockError> {
        match self.record.take() {
            Some(record) => self.lock.release(&record),
            None => Ok(()),
        }
    }
}

impl<L: CrossProcessLock> Drop for GuardHandle<L> {
    fn drop(&mut self) {
        if let Some(record) = self.record.take() {
            if let Err(e) = self.lock.release(&record) {
                tracing::warn!(identity = %record.identity, error = %e, "failed to release workflow lock");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryLock;
    use chrono::Utc;

    fn foreign(identity: &str, pid: u32) -> LockRecord {
        LockRecord {
            identity: identity.to_string(),
            pid,
            acquired_at: Utc::now(),
        }
    }

    #[test]
    fn second_acquire_is_contention() {
        let guard = ConcurrencyGuard::new(MemoryLock::default());
        let _held = guard.acquire("wf").unwrap();
        let err = guard.acquire("wf").err().unwrap();
        assert!(matches!(err, LockError::Contention { pid, .. } if pid == std::process::id()));
    }

    #[test]
    fn different_identities_are_independent() {
        let guard = ConcurrencyGuard::new(MemoryLock::default());
        let _a = guard.acquire("a").unwrap();
        assert!(guard.acquire("b").is_ok());
    }

    #[test]
    fn drop_releases() {
        let guard = ConcurrencyGuard::new(MemoryLock::default());
        {
            let _held = guard.acquire("wf").unwrap();
            assert!(guard.lock().holder("wf").is_some());
        }
        assert!(guard.lock().holder("wf").is_none());
        assert!(guard.acquire("wf").is_ok());
    }

    #[test]
    fn explicit_release() {
        let guard = ConcurrencyGuard::new(MemoryLock::default());
        let held = guard.acquire("wf").unwrap();
        held.release().unwrap();
        assert!(guard.lock().holder("wf").is_none());
    }

    #[test]
    fn stale_lock_is_reclaimed() {
        let lock = MemoryLock::default();
        lock.plant(foreign("wf", 999_999));
        lock.dead.lock().unwrap().push(999_999);
        let guard = ConcurrencyGuard::new(lock);

        let handle = guard.acquire("wf").unwrap();
        assert_eq!(handle.record().unwrap().pid, std::process::id());
    }

    #[test]
    fn live_foreign_lock_is_left_alone() {
        let lock = MemoryLock::default();
        lock.plant(foreign("wf", 4242));
        let guard = ConcurrencyGuard::new(lock);

        assert!(guard.acquire("wf").is_err());
        assert_eq!(guard.lock().holder("wf").unwrap().pid, 4242);
    }
}
