//! Shared utilities for research-rs
//!
//! Small helpers used across the workspace: tracing initialization and
//! environment-variable configuration lookups.

pub mod config;
pub mod logging;

pub use config::{env_or, optional_env};
pub use logging::init_tracing;
