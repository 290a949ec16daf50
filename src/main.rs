// src/main.rs

use std::process::ExitCode;

use proto_gen::logging::{self, LogConfig};
use proto_gen::sys::docker::DockerRuntime;
use proto_gen::sys::mount::HostMount;
use proto_gen::{GenConfig, LogFormat, Orchestrator, RunMode, PINNED_ENVIRONMENT};

const LOG_PREFIX: &str = "proto-gen: ";

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // ==============================================================================
    // 1. Configuration & Logging
    // ==============================================================================

    let config = match GenConfig::load() {
        Ok(config) => config,
        Err(e) => {
            logging::init(&LogConfig::new(LOG_PREFIX, LogFormat::Text));
            tracing::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    logging::init(&LogConfig::new(LOG_PREFIX, config.log_format));

    // ==============================================================================
    // 2. Working Directory (mounted at the identical path)
    // ==============================================================================

    let mount = match HostMount::current() {
        Ok(mount) => mount,
        Err(e) => {
            tracing::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    // ==============================================================================
    // 3. Build & Invoke
    // ==============================================================================

    let mode = RunMode::from_args(std::env::args().skip(1).collect());
    let runtime = DockerRuntime::new(config.docker_bin.clone());
    let mut orchestrator = Orchestrator::new(&runtime, mount, config, PINNED_ENVIRONMENT);

    match orchestrator.run(mode).await {
        Ok(()) => {
            tracing::info!("done");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
