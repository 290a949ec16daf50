use async_trait::async_trait;

use crate::environment::EnvironmentHandle;
use crate::error::Result;
use crate::sys::mount::HostMount;

// ==============================================================================
// 1. Image Build (Context-Free)
// ==============================================================================

/// What a build request hands the runtime. The build script is the whole
/// input: there is no context directory.
pub struct BuildRequest<'a> {
    pub script: &'a str,
    /// Optional human-readable tag applied alongside the content id.
    pub tag: Option<&'a str>,
}

// ==============================================================================
// 2. Container Execution (Equality-Preserving Mount)
// ==============================================================================

/// Outcome of one container run. stderr is streamed live to the operator,
/// so only the status survives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationResult {
    Success,
    /// `status` is `None` when the process died from a signal.
    Failed { status: Option<i32> },
}

impl InvocationResult {
    pub fn from_code(code: Option<i32>) -> Self {
        match code {
            Some(0) => InvocationResult::Success,
            other => InvocationResult::Failed { status: other },
        }
    }
}

#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Builds an image from `request.script` with an empty context and
    /// returns the runtime's opaque image id.
    async fn build_image(&self, request: BuildRequest<'_>) -> Result<EnvironmentHandle>;

    /// Runs the image's entrypoint with `args`, the host mount attached, and
    /// the container's output streams wired to our stderr. Only spawn
    /// failures are errors here; a non-zero exit is an `InvocationResult`.
    async fn run(
        &self,
        handle: &EnvironmentHandle,
        mount: &HostMount,
        args: &[String],
    ) -> Result<InvocationResult>;
}
