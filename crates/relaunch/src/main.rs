use relaunch::{
    PlatformRestartManagerFactory, ReleaseConfig, RestartConfig, RestartOrchestrator,
    RestartProcessManagerFactory,
};
use std::process::ExitStatus;
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Port the backend binds on startup.
const BACKEND_PORT: u16 = 8000;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let code = match run().await {
        // The server's exit code is ours; a signal death maps to 1.
        Ok(status) => status.code().unwrap_or(1),
        Err(e) => {
            error!("{:#}", anyhow::Error::from(e));
            1
        }
    };

    std::process::exit(code);
}

async fn run() -> Result<ExitStatus, relaunch::RelaunchError> {
    let config = RestartConfig::builder()
        .name("backend")
        .port(BACKEND_PORT)
        .command("python3")
        .args(["main.py"])
        .release_config(ReleaseConfig::fixed())
        .build()
        .map_err(|e| relaunch::RelaunchError::ConfigurationError(e.to_string()))?;

    let manager = PlatformRestartManagerFactory::create_process_manager(&config);
    RestartOrchestrator::new(config, manager)?.run().await
}
