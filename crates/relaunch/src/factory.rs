use relaunch_core::{RestartConfig, RestartProcessManagerFactory};

/// Platform-independent factory that selects the appropriate
/// implementation at compile time
pub struct PlatformRestartManagerFactory;

#[cfg(unix)]
impl RestartProcessManagerFactory for PlatformRestartManagerFactory {
    type Manager = relaunch_unix::UnixRestartProcessManager;

    fn create_process_manager(config: &RestartConfig) -> Self::Manager {
        relaunch_unix::UnixRestartManagerFactory::create_process_manager(config)
    }
}
