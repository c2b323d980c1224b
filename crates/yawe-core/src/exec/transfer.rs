use std::time::Duration;

use futures_util::future::BoxFuture;
use serde::Serialize;
use yawe_types::workflow::{TransferDirection, TransferMethod};

/// One resolved source/destination pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferItem {
    pub remote: String,
    pub local: String,
    pub recursive: bool,
    pub exclude: Vec<String>,
    pub method: TransferMethod,
    /// Pack the source into a tar.gz before moving it.
    pub pre_compress: bool,
    /// Unpack the archive at the destination (only with `pre_compress`).
    pub decompress: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub host: String,
    pub direction: TransferDirection,
    pub items: Vec<TransferItem>,
    /// Per-item timeout.
    pub timeout: Duration,
}

/// What happened to one item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemReport {
    pub remote_path: String,
    pub local_path: String,
    pub method: TransferMethod,
    pub compressed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archive_name: Option<String>,
    /// Where the archive remains; `None` once it was unpacked and removed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archive_path: Option<String>,
    pub elapsed_secs: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TransferReport {
    pub items: Vec<ItemReport>,
    pub total_time_secs: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("transfer of '{item}' failed: {message}")]
    Failed { item: String, message: String },

    #[error("transfer of '{item}' timed out after {secs}s")]
    Timeout { item: String, secs: u64 },

    #[error("transfer I/O error: {0}")]
    Io(String),
}

/// Moves files between the local machine and a remote host.
///
/// The whole item set is one unit: an error on any item fails the call.
pub trait FileTransfer: Send + Sync {
    fn transfer<'a>(
        &'a self,
        request: &'a TransferRequest,
    ) -> BoxFuture<'a, Result<TransferReport, TransferError>>;
}
