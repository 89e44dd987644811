//! Relaunch - free a TCP port and relaunch the server that owns it.
//!
//! The orchestrator runs a strict sequence: look up the processes bound
//! to the configured port, force-kill each of them, wait for the socket
//! to be released, then launch the replacement server with a freshly
//! constructed environment and propagate its exit status.

mod factory;
mod orchestrator;

pub use factory::PlatformRestartManagerFactory;
pub use orchestrator::RestartOrchestrator;

pub use relaunch_core::{
    ProcessId, RelaunchError, ReleaseConfig, RestartConfig, RestartProcessManager,
    RestartProcessManagerFactory, ServerHandle, TerminationResult,
};
