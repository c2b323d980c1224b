//! Collaborator traits consumed by tasks.
//!
//! Each trait is object-safe (boxed futures) so the engine can hold
//! `Arc<dyn ...>` collaborators chosen at wiring time:
//! - `command` -- local/remote command execution
//! - `transfer` -- file transfer between local and remote hosts
//! - `template` -- pure template rendering
//! - `notify` -- outbound notification sink

pub mod command;
pub mod notify;
pub mod template;
pub mod transfer;

pub use command::{CommandExecutor, CommandOutput, CommandRequest, ExecutorError, shell_quote};
pub use notify::{Notifier, NotifyError};
pub use template::{TemplateError, TemplateRenderer};
pub use transfer::{FileTransfer, ItemReport, TransferError, TransferItem, TransferReport, TransferRequest};
