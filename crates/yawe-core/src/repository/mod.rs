//! Persistence trait definitions (ports).
//!
//! These traits define the storage and locking interface that the
//! infrastructure layer (yawe-infra) implements. The engine never depends on a
//! specific file layout or locking primitive.

pub mod lock;
pub mod state;
