use crate::config::RestartConfig;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::process::ExitStatus;

/// Unique identifier for an operating-system process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProcessId(pub u32);

impl From<u32> for ProcessId {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

impl std::fmt::Display for ProcessId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Result of a termination request
///
/// A missing or permission-protected process is an expected outcome, not
/// an error: the restart sequence tolerates every variant.
#[derive(Debug, Clone, PartialEq)]
pub enum TerminationResult {
    /// Signal was delivered
    Success,
    /// Process was not found (already exited)
    ProcessNotFound,
    /// Permission denied (insufficient privileges)
    PermissionDenied,
    /// Signal delivery failed with a specific error message
    Failed(String),
}

/// Handle to a launched server process
#[async_trait]
pub trait ServerHandle: Send {
    /// OS process identifier, if the process has not already exited
    fn pid(&self) -> Option<ProcessId>;

    /// Check whether the process is still alive (signal-0 probe)
    async fn is_running(&self) -> bool;

    /// Wait for the process to exit and return its exit status
    async fn wait(&mut self) -> Result<ExitStatus>;
}

/// Platform seam for the restart sequence
///
/// Implementations cover the three OS interactions the orchestrator
/// needs: mapping a listening port to its owners, delivering an
/// unblockable kill signal, and spawning the replacement server with an
/// explicitly constructed environment.
#[async_trait]
pub trait RestartProcessManager: Send + Sync {
    /// The type of process handle returned by `start_server`
    type Handle: ServerHandle;

    /// Create a new process manager instance with the given configuration
    ///
    /// The configuration is stored internally and drives `start_server`.
    fn new(config: &RestartConfig) -> Self
    where
        Self: Sized;

    /// Resolve the set of PIDs currently listening on `port`
    ///
    /// An empty set is a normal outcome, not an error. Each PID appears
    /// at most once.
    async fn owners_of_port(&self, port: u16) -> Result<Vec<ProcessId>>;

    /// Request immediate, non-graceful termination of `pid`
    ///
    /// Never returns an error: delivery failures are reported through
    /// [`TerminationResult`] so the caller can tolerate them.
    async fn force_kill(&self, pid: ProcessId) -> TerminationResult;

    /// Spawn the configured server command with exactly the provided
    /// environment and inherited stdio
    async fn start_server(&self, env: &HashMap<String, String>) -> Result<Self::Handle>;
}

/// Factory trait for creating platform-specific RestartProcessManager
/// implementations
pub trait RestartProcessManagerFactory {
    /// The type of process manager this factory creates
    type Manager: RestartProcessManager;

    /// Create a new process manager instance for the current platform
    fn create_process_manager(config: &RestartConfig) -> Self::Manager;
}
