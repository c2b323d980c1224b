//! Logging and trace export setup for the workflow runner.

pub mod tracing_setup;
