mod port_scanner;
mod process_manager;

pub use port_scanner::owners_of_port;
pub use process_manager::{UnixRestartProcessManager, UnixServerHandle};

#[cfg(unix)]
use relaunch_core::{RestartConfig, RestartProcessManager, RestartProcessManagerFactory};

/// Factory for creating Unix RestartProcessManager instances
pub struct UnixRestartManagerFactory;

#[cfg(unix)]
impl RestartProcessManagerFactory for UnixRestartManagerFactory {
    type Manager = UnixRestartProcessManager;

    fn create_process_manager(config: &RestartConfig) -> Self::Manager {
        UnixRestartProcessManager::new(config)
    }
}

impl UnixRestartManagerFactory {
    pub fn platform_name() -> &'static str {
        "Unix"
    }
}
