//! Cross-process lock capability.
//!
//! The contract is independent of the locking primitive: a non-blocking
//! acquire that reports the current holder on contention, an explicit
//! release, and a staleness probe for the holder recorded in the lock.

use yawe_types::error::LockError;
use yawe_types::state::LockRecord;

pub trait CrossProcessLock: Send + Sync {
    /// Try to take the lock for `identity` without blocking.
    ///
    /// Returns `LockError::Contention` carrying the current holder when the
    /// lock record already exists, whether or not that holder is alive.
    fn try_acquire(&self, identity: &str) -> Result<LockRecord, LockError>;

    /// Current lock record for `identity`, if any.
    fn read(&self, identity: &str) -> Result<Option<LockRecord>, LockError>;

    /// Remove the lock record, but only if it still belongs to `record`.
    fn release(&self, record: &LockRecord) -> Result<(), LockError>;

    /// True when the owner recorded in `record` is no longer alive.
    fn is_stale(&self, record: &LockRecord) -> bool;

    /// Remove a stale record. Returns `false` if the lock changed hands
    /// since `record` was read and nothing was removed.
    fn break_stale(&self, record: &LockRecord) -> Result<bool, LockError>;
}
