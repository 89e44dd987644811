use thiserror::Error;

/// Error taxonomy for the restart sequence
///
/// Lookup and termination failures never appear here: the orchestrator
/// swallows them after logging. Only configuration problems and the
/// launch step surface as errors.
#[derive(Error, Debug)]
pub enum RelaunchError {
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Failed to launch server: {0}")]
    LaunchFailed(String),

    #[error("Unexpected error: {0}")]
    Other(#[from] anyhow::Error),
}

impl RelaunchError {
    /// Check if this error came from the launch step (always fatal, no retry)
    pub fn is_launch_failure(&self) -> bool {
        matches!(self, RelaunchError::LaunchFailed(_))
    }

    /// Check if this error was detected before any side effect happened
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, RelaunchError::ConfigurationError(_))
    }
}
