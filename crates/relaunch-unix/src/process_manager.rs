use anyhow::Result;
use async_trait::async_trait;
use relaunch_core::{
    ProcessId, RestartConfig, RestartProcessManager, ServerHandle, TerminationResult,
};
use std::collections::HashMap;
use std::process::ExitStatus;

#[cfg(unix)]
mod unix_impl {
    use super::*;
    use anyhow::Context;
    use nix::sys::signal::{self, Signal};
    use nix::unistd::Pid as NixPid;
    use tokio::process::{Child, Command};
    use tracing::{info, warn};

    /// Handle to a server process launched on Unix
    pub struct UnixServerHandle {
        child: Child,
        command: String,
    }

    impl UnixServerHandle {
        pub fn new(child: Child, command: String) -> Self {
            Self { child, command }
        }
    }

    #[async_trait]
    impl ServerHandle for UnixServerHandle {
        fn pid(&self) -> Option<ProcessId> {
            self.child.id().map(ProcessId::from)
        }

        async fn is_running(&self) -> bool {
            if let Some(pid) = self.pid() {
                let nix_pid = NixPid::from_raw(pid.0 as i32);
                // Signal 0 probes for existence without delivering anything
                signal::kill(nix_pid, None).is_ok()
            } else {
                false
            }
        }

        async fn wait(&mut self) -> Result<ExitStatus> {
            self.child
                .wait()
                .await
                .with_context(|| format!("failed waiting for {}", self.command))
        }
    }

    /// Unix implementation of the restart seam: procfs port lookup,
    /// SIGKILL delivery, and tokio-based server spawning
    pub struct UnixRestartProcessManager {
        config: RestartConfig,
    }

    #[async_trait]
    impl RestartProcessManager for UnixRestartProcessManager {
        type Handle = UnixServerHandle;

        fn new(config: &RestartConfig) -> Self {
            Self {
                config: config.clone(),
            }
        }

        async fn owners_of_port(&self, port: u16) -> Result<Vec<ProcessId>> {
            crate::port_scanner::owners_of_port(port)
        }

        async fn force_kill(&self, pid: ProcessId) -> TerminationResult {
            let nix_pid = NixPid::from_raw(pid.0 as i32);

            match signal::kill(nix_pid, Signal::SIGKILL) {
                Ok(()) => {
                    info!("Sent SIGKILL to process {}", pid);
                    TerminationResult::Success
                }
                Err(nix::errno::Errno::ESRCH) => {
                    info!("Process {} not found (already terminated)", pid);
                    TerminationResult::ProcessNotFound
                }
                Err(nix::errno::Errno::EPERM) => {
                    warn!("Permission denied to kill process {}", pid);
                    TerminationResult::PermissionDenied
                }
                Err(e) => {
                    warn!("Failed to send SIGKILL to process {}: {}", pid, e);
                    TerminationResult::Failed(format!("SIGKILL failed: {e}"))
                }
            }
        }

        async fn start_server(&self, env: &HashMap<String, String>) -> Result<UnixServerHandle> {
            let command = &self.config.command;

            let mut cmd = Command::new(command);
            cmd.args(&self.config.args);

            if let Some(dir) = &self.config.working_directory {
                cmd.current_dir(dir);
            }

            // The launch environment was constructed up front; pass it
            // through verbatim instead of layering over our own.
            cmd.env_clear();
            cmd.envs(env);

            let child = cmd
                .spawn()
                .with_context(|| format!("Failed to start command: {command}"))?;

            match child.id() {
                Some(pid) => {
                    info!(
                        "Started server: {} with args: {:?}, PID: {}",
                        command, self.config.args, pid
                    );
                }
                None => {
                    warn!(
                        "Started server: {} with args: {:?}, but PID is not available (process may have exited quickly)",
                        command, self.config.args
                    );
                }
            }

            Ok(UnixServerHandle::new(child, command.clone()))
        }
    }
}

#[cfg(unix)]
pub use unix_impl::{UnixRestartProcessManager, UnixServerHandle};

// Provide stub implementations for non-Unix systems
#[cfg(not(unix))]
pub struct UnixServerHandle;

#[cfg(not(unix))]
pub struct UnixRestartProcessManager;

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn manager(command: &str, args: &[&str]) -> UnixRestartProcessManager {
        let config = RestartConfig::builder()
            .name("test-server")
            .port(0u16)
            .command(command)
            .args(args.iter().copied())
            .build()
            .unwrap();
        UnixRestartProcessManager::new(&config)
    }

    #[tokio::test]
    async fn test_force_kill_then_process_not_found() {
        let m = manager("/bin/sh", &["-c", "sleep 30"]);
        let mut handle = m.start_server(&HashMap::new()).await.unwrap();
        let pid = handle.pid().expect("spawned process has a PID");
        assert!(handle.is_running().await);

        assert_eq!(m.force_kill(pid).await, TerminationResult::Success);

        let status = handle.wait().await.unwrap();
        assert!(!status.success());

        // The process is reaped now, so a second kill must be tolerated.
        assert_eq!(m.force_kill(pid).await, TerminationResult::ProcessNotFound);
    }

    #[tokio::test]
    async fn test_exit_status_is_reported() {
        let m = manager("/bin/sh", &["-c", "exit 7"]);
        let mut handle = m.start_server(&HashMap::new()).await.unwrap();
        let status = handle.wait().await.unwrap();
        assert_eq!(status.code(), Some(7));
    }

    #[tokio::test]
    async fn test_spawn_failure_surfaces_as_error() {
        let m = manager("/nonexistent/relaunch-test-binary", &[]);
        let result = m.start_server(&HashMap::new()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_constructed_env_is_passed_verbatim() {
        let mut env = HashMap::new();
        env.insert("MARKER".to_string(), "on".to_string());

        let m = manager("/bin/sh", &["-c", "test \"$MARKER\" = on"]);
        let mut handle = m.start_server(&env).await.unwrap();
        assert!(handle.wait().await.unwrap().success());

        // Without the variable the same probe fails: nothing leaked in
        // from the parent environment.
        let m = manager("/bin/sh", &["-c", "test \"$MARKER\" = on"]);
        let mut handle = m.start_server(&HashMap::new()).await.unwrap();
        assert!(!handle.wait().await.unwrap().success());
    }
}
