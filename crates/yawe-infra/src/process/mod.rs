//! Process-spawning collaborators.
//!
//! - `executor` -- `ProcessExecutor`: local shell and ssh commands
//! - `transfer` -- `RsyncTransfer`: rsync/scp with optional tar pre-compression

pub mod executor;
pub mod transfer;

pub use executor::ProcessExecutor;
pub use transfer::RsyncTransfer;
