use backon::{BackoffBuilder, ExponentialBuilder};
use relaunch_core::{
    RelaunchError, RestartConfig, RestartProcessManager, ServerHandle, TerminationResult,
    build_launch_env,
};
use std::collections::HashMap;
use std::process::ExitStatus;
use tracing::{info, warn};

/// Drives the restart sequence: kill the port owners, wait for the
/// socket to be released, launch the replacement server.
///
/// Each phase runs at most once and no phase can be revisited. Lookup
/// and termination failures are logged and swallowed; only the launch
/// step is fatal.
#[derive(Debug)]
pub struct RestartOrchestrator<M: RestartProcessManager> {
    config: RestartConfig,
    manager: M,
}

impl<M: RestartProcessManager> RestartOrchestrator<M> {
    /// Validate the configuration and wrap the platform manager.
    pub fn new(config: RestartConfig, manager: M) -> Result<Self, RelaunchError> {
        config
            .release_config
            .validate()
            .map_err(|e| RelaunchError::ConfigurationError(format!("invalid release config: {e}")))?;

        Ok(Self { config, manager })
    }

    pub fn config(&self) -> &RestartConfig {
        &self.config
    }

    /// Run the full sequence and return the launched server's exit status.
    pub async fn run(&self) -> Result<ExitStatus, RelaunchError> {
        self.terminate_owners().await;
        self.await_release().await;
        let env = self.launch_environment()?;
        self.launch(env).await
    }

    /// Kill every process currently listening on the configured port.
    ///
    /// An empty owner set is a normal outcome. Lookup errors are treated
    /// as an empty set; termination failures never abort the sequence.
    async fn terminate_owners(&self) {
        let port = self.config.port;
        let owners = match self.manager.owners_of_port(port).await {
            Ok(owners) => owners,
            Err(e) => {
                warn!("Port-owner lookup failed for port {}: {:#}", port, e);
                Vec::new()
            }
        };

        if owners.is_empty() {
            info!("No process is listening on port {}", port);
            return;
        }

        info!("Terminating {} process(es) on port {}", owners.len(), port);
        for pid in owners {
            match self.manager.force_kill(pid).await {
                TerminationResult::Success => {
                    info!("Killed process {} on port {}", pid, port);
                }
                TerminationResult::ProcessNotFound => {
                    info!("Process {} already terminated", pid);
                }
                TerminationResult::PermissionDenied => {
                    warn!("Permission denied killing process {}", pid);
                }
                TerminationResult::Failed(reason) => {
                    warn!("Failed to kill process {}: {}", pid, reason);
                }
            }
        }
    }

    /// Wait for the kernel to release the socket.
    ///
    /// Either a single fixed delay, or a bounded backoff loop that
    /// re-queries the port and stops as soon as the owner set is empty.
    /// The poll falling through its attempt budget is not fatal: the
    /// launch step reports the conflict soon enough.
    async fn await_release(&self) {
        let release = &self.config.release_config;
        let port = self.config.port;

        if release.poll_owners {
            let mut backoff = ExponentialBuilder::default()
                .with_min_delay(release.min_delay())
                .with_max_delay(release.max_delay())
                .with_max_times(release.max_attempts as usize)
                .build();

            while let Some(delay) = backoff.next() {
                match self.manager.owners_of_port(port).await {
                    Ok(owners) if owners.is_empty() => {
                        info!("Port {} released", port);
                        return;
                    }
                    Ok(owners) => {
                        info!("Port {} still held by {} process(es)", port, owners.len());
                    }
                    Err(e) => {
                        warn!("Release poll failed for port {}: {:#}", port, e);
                    }
                }
                tokio::time::sleep(delay).await;
            }

            warn!(
                "Port {} still busy after {} poll attempts, launching anyway",
                port, release.max_attempts
            );
        } else if release.delay_ms > 0 {
            info!(
                "Waiting {}ms for the socket on port {} to be released",
                release.delay_ms, port
            );
            tokio::time::sleep(release.delay()).await;
        }
    }

    /// Construct the launch environment from the current process
    /// environment, the configured extras, and the search-path append.
    fn launch_environment(&self) -> Result<HashMap<String, String>, RelaunchError> {
        let dir = match &self.config.working_directory {
            Some(dir) => dir.clone(),
            None => std::env::current_dir()
                .map_err(|e| RelaunchError::Other(anyhow::Error::from(e)))?,
        };

        let env = build_launch_env(
            std::env::vars(),
            &self.config.env,
            &self.config.search_path_var,
            &dir,
        )?;

        info!(
            "Launch environment ready: {}={}",
            self.config.search_path_var,
            env.get(&self.config.search_path_var)
                .map(String::as_str)
                .unwrap_or_default()
        );
        Ok(env)
    }

    /// Launch the server as the terminal action and wait it out.
    async fn launch(&self, env: HashMap<String, String>) -> Result<ExitStatus, RelaunchError> {
        info!(
            "Launching server: {} {:?}",
            self.config.command, self.config.args
        );

        let mut handle = self
            .manager
            .start_server(&env)
            .await
            .map_err(|e| RelaunchError::LaunchFailed(format!("{e:#}")))?;

        handle.wait().await.map_err(RelaunchError::Other)
    }
}
