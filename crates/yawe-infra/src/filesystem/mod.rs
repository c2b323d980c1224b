//! Filesystem-backed state store and cross-process lock.

pub mod lock;
pub mod state_store;

pub use lock::FileLock;
pub use state_store::JsonStateStore;
