//! Workflow state store trait definition.

use chrono::{DateTime, Utc};
use yawe_types::error::StoreError;
use yawe_types::state::WorkflowState;

/// Durable record of per-task status, keyed by workflow identity.
///
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait StateStore: Send + Sync {
    /// Load the persisted state for an identity, if any.
    fn load(
        &self,
        identity: &str,
    ) -> impl std::future::Future<Output = Result<Option<WorkflowState>, StoreError>> + Send;

    /// Persist a state atomically. A partially written record is never visible.
    fn save(
        &self,
        state: &WorkflowState,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Delete the persisted state. Returns `true` if it existed.
    fn reset(
        &self,
        identity: &str,
    ) -> impl std::future::Future<Output = Result<bool, StoreError>> + Send;

    /// All persisted states, unordered.
    fn list(&self) -> impl std::future::Future<Output = Result<Vec<WorkflowState>, StoreError>> + Send;

    /// Delete successful states last updated before `older_than`.
    /// Returns the number of records removed.
    fn prune(
        &self,
        older_than: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<usize, StoreError>> + Send;
}
