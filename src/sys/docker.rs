// src/sys/docker.rs

use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncWriteExt};
use tokio::process::Command;
use tracing::warn;

use crate::environment::EnvironmentHandle;
use crate::error::{GenError, Result};
use crate::sys::mount::HostMount;
use crate::sys::traits::{BuildRequest, ContainerRuntime, InvocationResult};

/// `docker` CLI driver. The executable is injected so podman or a wrapper
/// script can stand in.
pub struct DockerRuntime {
    bin: String,
}

impl DockerRuntime {
    pub fn new(bin: impl Into<String>) -> Self {
        Self { bin: bin.into() }
    }

    pub fn build_args(tag: Option<&str>) -> Vec<String> {
        let mut args = vec!["build".to_string(), "-q".to_string()];
        if let Some(tag) = tag {
            args.push("-t".to_string());
            args.push(tag.to_string());
        }
        // "-": Dockerfile on stdin, no context directory is sent.
        args.push("-".to_string());
        args
    }

    pub fn run_args(handle: &EnvironmentHandle, mount: &HostMount, args: &[String]) -> Vec<String> {
        let mut argv = vec![
            "run".to_string(),
            "--rm".to_string(),
            "-v".to_string(),
            mount.volume_arg(),
            handle.id().to_string(),
        ];
        argv.extend(args.iter().cloned());
        argv
    }

    fn spawn_error(&self, source: std::io::Error) -> GenError {
        GenError::Spawn { program: self.bin.clone(), source }
    }
}

/// Copies a child stream to our stderr as bytes arrive. No line buffering, so
/// partial lines and non-UTF-8 diagnostics pass through intact.
fn relay_to_stderr<R>(stream: R) -> tokio::task::JoinHandle<std::io::Result<u64>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut stream = stream;
        let mut stderr = tokio::io::stderr();
        let copied = tokio::io::copy(&mut stream, &mut stderr).await?;
        stderr.flush().await?;
        Ok(copied)
    })
}

/// Waits for a relay to drain. A failed copy only loses diagnostics, never
/// the child's result, so it is reported and the run goes on.
async fn finish_relay(stream: &str, relay: tokio::task::JoinHandle<std::io::Result<u64>>) {
    match relay.await {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => warn!(stream, error = %e, "failed to relay container output"),
        Err(e) => warn!(stream, error = %e, "container output relay task aborted"),
    }
}

fn describe_status(status: std::process::ExitStatus) -> String {
    match status.code() {
        Some(code) => format!("exit status {}", code),
        None => "terminated by signal".to_string(),
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn build_image(&self, request: BuildRequest<'_>) -> Result<EnvironmentHandle> {
        let mut child = Command::new(&self.bin)
            .args(Self::build_args(request.tag))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        let stderr_relay = child.stderr.take().map(relay_to_stderr);

        // Feed the script and close stdin so the build can start. A write
        // error is held until the child has been reaped.
        let fed = match child.stdin.take() {
            Some(mut stdin) => match stdin.write_all(request.script.as_bytes()).await {
                Ok(()) => stdin.shutdown().await,
                Err(e) => Err(e),
            },
            None => Ok(()),
        };

        let output = child.wait_with_output().await?;
        if let Some(relay) = stderr_relay {
            finish_relay("stderr", relay).await;
        }

        if !output.status.success() {
            return Err(GenError::EnvironmentBuild(describe_status(output.status)));
        }
        if let Err(e) = fed {
            return Err(GenError::EnvironmentBuild(format!(
                "could not send build script to {}: {}",
                self.bin, e
            )));
        }

        // `build -q` prints the image id and nothing else.
        let id = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if id.is_empty() {
            return Err(GenError::EnvironmentBuild("build produced no image id".into()));
        }
        Ok(EnvironmentHandle::new(id))
    }

    async fn run(
        &self,
        handle: &EnvironmentHandle,
        mount: &HostMount,
        args: &[String],
    ) -> Result<InvocationResult> {
        let mut child = Command::new(&self.bin)
            .args(Self::run_args(handle, mount, args))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        // protoc has nothing useful for stdout; both streams are diagnostics.
        let stdout_relay = child.stdout.take().map(relay_to_stderr);
        let stderr_relay = child.stderr.take().map(relay_to_stderr);

        let status = child.wait().await?;

        if let Some(relay) = stdout_relay {
            finish_relay("stdout", relay).await;
        }
        if let Some(relay) = stderr_relay {
            finish_relay("stderr", relay).await;
        }

        Ok(InvocationResult::from_code(status.code()))
    }
}
