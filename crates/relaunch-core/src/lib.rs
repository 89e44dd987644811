//! Relaunch core - platform-independent abstractions and configuration
//!
//! This crate provides the configuration, error types, process/port traits,
//! and launch-environment construction shared by the platform-specific
//! implementations and the orchestrator layer.

pub mod config;
pub mod environment;
pub mod error;
pub mod process;

pub use config::*;
pub use environment::*;
pub use error::*;
pub use process::*;
