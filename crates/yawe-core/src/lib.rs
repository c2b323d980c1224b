//! Execution engine and port trait definitions for yawe.
//!
//! This crate defines the "ports" that the infrastructure layer implements
//! (state store, cross-process lock, command executor, file transfer,
//! template renderer, notifier) and the engine that drives tasks through
//! them. It depends only on `yawe-types` -- never on `yawe-infra` or any
//! process/network crate.

pub mod exec;
pub mod repository;
pub mod task;
pub mod workflow;

#[cfg(test)]
pub(crate) mod testing;
