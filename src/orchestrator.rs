// src/orchestrator.rs

use std::path::Path;
use tracing::{debug, info};

use crate::config::{self, GenConfig};
use crate::environment::{EnvironmentBuilder, EnvironmentHandle, EnvironmentSpecification};
use crate::error::{GenError, Result};
use crate::invocation::InvocationRequest;
use crate::sys::discovery;
use crate::sys::mount::HostMount;
use crate::sys::traits::{ContainerRuntime, InvocationResult};

/// What the operator asked for on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunMode {
    /// Walk the input root and derive protoc flags.
    Discovery,
    /// Forward these arguments to protoc as-is.
    Explicit(Vec<String>),
}

impl RunMode {
    /// No arguments means discovery; anything else is passed through.
    pub fn from_args(args: Vec<String>) -> Self {
        if args.is_empty() {
            RunMode::Discovery
        } else {
            RunMode::Explicit(args)
        }
    }
}

/// Lifecycle of a single run. `Done` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    BuildingEnvironment,
    Invoking { completed: usize, total: usize },
    Done { invocations: usize },
    /// `completed` invocations had succeeded before the failure.
    Failed { completed: usize },
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Done { .. } | RunState::Failed { .. })
    }
}

// ==============================================================================
// Orchestrator
// ==============================================================================

/// Builds the pinned image once, then runs protoc in it one invocation at a
/// time. The first failure is fatal: later invocations are never started.
pub struct Orchestrator<'r> {
    runtime: &'r dyn ContainerRuntime,
    mount: HostMount,
    config: GenConfig,
    spec: EnvironmentSpecification,
    state: RunState,
}

impl<'r> Orchestrator<'r> {
    pub fn new(
        runtime: &'r dyn ContainerRuntime,
        mount: HostMount,
        config: GenConfig,
        spec: EnvironmentSpecification,
    ) -> Self {
        Self {
            runtime,
            mount,
            config,
            spec,
            state: RunState::Idle,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// The whole pipeline: plan, build, invoke. Planning happens first so an
    /// empty or malformed tree fails before any image work.
    pub async fn run(&mut self, mode: RunMode) -> Result<()> {
        let outcome = self.drive(mode).await;
        if outcome.is_err() {
            self.fail();
        }
        outcome
    }

    async fn drive(&mut self, mode: RunMode) -> Result<()> {
        let requests = self.plan(mode)?;

        self.state = RunState::BuildingEnvironment;
        let handle = EnvironmentBuilder::new(self.runtime)
            .materialize(self.spec)
            .await?;

        self.execute(&handle, &requests).await
    }

    /// Turns the run mode into the ordered list of protoc invocations.
    pub fn plan(&self, mode: RunMode) -> Result<Vec<InvocationRequest>> {
        match mode {
            RunMode::Explicit(args) => Ok(vec![InvocationRequest::explicit(args)]),
            RunMode::Discovery => {
                config::validate_input_root(&self.config.input_root)?;
                let input_root = Path::new(&self.config.input_root);
                let files = discovery::discover(self.mount.root(), input_root)?;
                let headers = discovery::scan_headers(&files)?;
                let groups = discovery::group(files, &headers, self.config.grouping);
                debug!(groups = groups.len(), "planned discovery invocations");

                Ok(groups
                    .iter()
                    .map(|group| {
                        InvocationRequest::for_group(&self.mount, input_root, self.spec.plugins, group)
                    })
                    .collect())
            }
        }
    }

    /// Runs `requests` in order against `handle`, stopping at the first
    /// non-zero exit.
    pub async fn execute(&mut self, handle: &EnvironmentHandle, requests: &[InvocationRequest]) -> Result<()> {
        self.state = RunState::Invoking { completed: 0, total: requests.len() };

        for request in requests {
            let RunState::Invoking { completed, total } = self.state else {
                break;
            };

            if request.sources.is_empty() {
                info!("compiling with explicit arguments...");
            }
            for source in &request.sources {
                info!("compiling {}...", source.display());
            }

            match self.runtime.run(handle, &self.mount, &request.args).await {
                Ok(InvocationResult::Success) => {
                    self.state = RunState::Invoking { completed: completed + 1, total };
                }
                Ok(InvocationResult::Failed { status }) => {
                    self.state = RunState::Failed { completed };
                    return Err(GenError::Invocation { status });
                }
                Err(e) => {
                    self.state = RunState::Failed { completed };
                    return Err(e);
                }
            }
        }

        if let RunState::Invoking { completed, .. } = self.state {
            self.state = RunState::Done { invocations: completed };
        }
        Ok(())
    }

    fn fail(&mut self) {
        if let RunState::Failed { .. } = self.state {
            return;
        }
        let completed = match self.state {
            RunState::Invoking { completed, .. } => completed,
            _ => 0,
        };
        self.state = RunState::Failed { completed };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Grouping;
    use crate::environment::PINNED_ENVIRONMENT;
    use crate::sys::traits::BuildRequest;
    use async_trait::async_trait;
    use std::fs;
    use std::sync::Mutex;

    /// Fake runtime: records every call and fails the n-th run if asked.
    #[derive(Default)]
    struct FakeRuntime {
        builds: Mutex<usize>,
        runs: Mutex<Vec<Vec<String>>>,
        fail_build: bool,
        fail_run_at: Option<usize>,
    }

    #[async_trait]
    impl ContainerRuntime for FakeRuntime {
        async fn build_image(&self, _: BuildRequest<'_>) -> Result<EnvironmentHandle> {
            *self.builds.lock().unwrap() += 1;
            if self.fail_build {
                return Err(GenError::EnvironmentBuild("exit status 1".into()));
            }
            Ok(EnvironmentHandle::new("sha256:test".into()))
        }

        async fn run(&self, _: &EnvironmentHandle, _: &HostMount, args: &[String]) -> Result<InvocationResult> {
            let mut runs = self.runs.lock().unwrap();
            let n = runs.len();
            runs.push(args.to_vec());
            if self.fail_run_at == Some(n) {
                return Ok(InvocationResult::Failed { status: Some(1) });
            }
            Ok(InvocationResult::Success)
        }
    }

    fn tree(files: &[(&str, &str)]) -> tempfile::TempDir {
        let tmp = tempfile::tempdir().unwrap();
        for (rel, body) in files {
            let path = tmp.path().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, body).unwrap();
        }
        tmp
    }

    fn orchestrator<'r>(runtime: &'r FakeRuntime, root: &Path, grouping: Grouping) -> Orchestrator<'r> {
        let config = GenConfig { grouping, ..GenConfig::default() };
        Orchestrator::new(runtime, HostMount::new(root).unwrap(), config, PINNED_ENVIRONMENT)
    }

    #[test]
    fn mode_follows_argument_presence() {
        assert_eq!(RunMode::from_args(vec![]), RunMode::Discovery);
        assert_eq!(
            RunMode::from_args(vec!["--version".into()]),
            RunMode::Explicit(vec!["--version".into()])
        );
    }

    #[tokio::test]
    async fn explicit_mode_runs_exactly_once_with_given_args() {
        let tmp = tree(&[]);
        let runtime = FakeRuntime::default();
        let mut orch = orchestrator(&runtime, tmp.path(), Grouping::Single);
        let args: Vec<String> = vec!["--proto_path=/x".into(), "--go_out=/y".into(), "/x/a.proto".into()];

        orch.run(RunMode::Explicit(args.clone())).await.unwrap();

        assert_eq!(*runtime.runs.lock().unwrap(), vec![args]);
        assert_eq!(orch.state(), RunState::Done { invocations: 1 });
    }

    #[tokio::test]
    async fn empty_discovery_fails_before_building_or_invoking() {
        let tmp = tree(&[("proto/readme.txt", "")]);
        let runtime = FakeRuntime::default();
        let mut orch = orchestrator(&runtime, tmp.path(), Grouping::Single);

        let err = orch.run(RunMode::Discovery).await.unwrap_err();

        assert!(matches!(err, GenError::NoInputsFound(_)));
        assert_eq!(*runtime.builds.lock().unwrap(), 0);
        assert!(runtime.runs.lock().unwrap().is_empty());
        assert_eq!(orch.state(), RunState::Failed { completed: 0 });
    }

    #[tokio::test]
    async fn build_failure_is_fatal_and_skips_invocations() {
        let tmp = tree(&[("proto/a.proto", "package a;\n")]);
        let runtime = FakeRuntime { fail_build: true, ..FakeRuntime::default() };
        let mut orch = orchestrator(&runtime, tmp.path(), Grouping::Single);

        let err = orch.run(RunMode::Discovery).await.unwrap_err();

        assert!(matches!(err, GenError::EnvironmentBuild(_)));
        assert!(runtime.runs.lock().unwrap().is_empty());
        assert!(orch.state().is_terminal());
    }

    #[tokio::test]
    async fn first_failed_group_aborts_the_rest() {
        let tmp = tree(&[
            ("proto/a/one.proto", "package a;\n"),
            ("proto/b/two.proto", "package b;\n"),
            ("proto/c/three.proto", "package c;\n"),
        ]);
        let runtime = FakeRuntime { fail_run_at: Some(1), ..FakeRuntime::default() };
        let mut orch = orchestrator(&runtime, tmp.path(), Grouping::ByPackage);

        let err = orch.run(RunMode::Discovery).await.unwrap_err();

        assert!(matches!(err, GenError::Invocation { status: Some(1) }));
        assert_eq!(runtime.runs.lock().unwrap().len(), 2);
        assert_eq!(orch.state(), RunState::Failed { completed: 1 });
    }

    #[tokio::test]
    async fn package_grouping_issues_one_invocation_per_package() {
        let tmp = tree(&[
            ("proto/a/msg.proto", "package a;\n"),
            ("proto/b/msg.proto", "package b;\n"),
        ]);
        let runtime = FakeRuntime::default();
        let mut orch = orchestrator(&runtime, tmp.path(), Grouping::ByPackage);

        orch.run(RunMode::Discovery).await.unwrap();

        let runs = runtime.runs.lock().unwrap();
        assert_eq!(runs.len(), 2);
        let root = tmp.path().display().to_string();
        assert_eq!(runs[0].last().unwrap(), &format!("{}/proto/a/msg.proto", root));
        assert_eq!(runs[1].last().unwrap(), &format!("{}/proto/b/msg.proto", root));
        assert_eq!(orch.state(), RunState::Done { invocations: 2 });
    }

    #[tokio::test]
    async fn input_root_outside_the_mount_is_refused() {
        let outside = tree(&[("p/x.proto", "package x;\n")]);
        let cwd = tree(&[]);
        let runtime = FakeRuntime::default();
        let config = GenConfig {
            input_root: outside.path().join("p").display().to_string(),
            ..GenConfig::default()
        };
        let mut orch = Orchestrator::new(&runtime, HostMount::new(cwd.path()).unwrap(), config, PINNED_ENVIRONMENT);

        let err = orch.run(RunMode::Discovery).await.unwrap_err();

        assert!(matches!(err, GenError::Config(_)));
        assert_eq!(*runtime.builds.lock().unwrap(), 0);
        assert!(runtime.runs.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn execute_with_no_requests_is_done() {
        let tmp = tree(&[]);
        let runtime = FakeRuntime::default();
        let mut orch = orchestrator(&runtime, tmp.path(), Grouping::Single);

        orch.execute(&EnvironmentHandle::new("img".into()), &[]).await.unwrap();
        assert_eq!(orch.state(), RunState::Done { invocations: 0 });
    }
}
