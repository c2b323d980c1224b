//! Shared domain types for yawe.
//!
//! This crate contains the declarative workflow model (definitions, task
//! specs, engine configuration), the persisted execution state, and the error
//! types shared between the engine and its adapters.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod config;
pub mod error;
pub mod state;
pub mod workflow;
