//! Infrastructure layer for yawe.
//!
//! Contains implementations of the port traits defined in `yawe-core`:
//! JSON state files and pid lock files, local/ssh command execution and
//! rsync/scp transfers via `tokio::process`, minijinja template rendering,
//! an HTTP notifier, and config file loading.

pub mod config;
pub mod filesystem;
pub mod notify;
pub mod process;
pub mod template;
