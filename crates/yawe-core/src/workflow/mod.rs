//! Workflow engine core: definition handling, resumable sequential execution.
//!
//! - `definition` -- YAML parsing, validation, workflow identity
//! - `context` -- exported variables propagated between tasks
//! - `retry` -- fixed-interval retry policy
//! - `guard` -- cross-process concurrency guard with stale-owner reclaim
//! - `checkpoint` -- run-mode state preparation and durable checkpoints
//! - `engine` -- the sequential task loop
//! - `report` -- run report and exit codes

pub mod checkpoint;
pub mod context;
pub mod definition;
pub mod engine;
pub mod guard;
pub mod report;
pub mod retry;
