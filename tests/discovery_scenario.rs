//! End-to-end discovery run against a recording runtime: two packages in
//! sibling directories, compiled in one protoc invocation.

use async_trait::async_trait;
use std::fs;
use std::sync::Mutex;

use proto_gen::sys::mount::HostMount;
use proto_gen::sys::traits::{BuildRequest, ContainerRuntime, InvocationResult};
use proto_gen::{
    EnvironmentHandle, GenConfig, GenError, Orchestrator, RunMode, RunState, PINNED_ENVIRONMENT,
};

#[derive(Default)]
struct Recorder {
    scripts: Mutex<Vec<String>>,
    runs: Mutex<Vec<(String, String, Vec<String>)>>,
    exit_code: Option<i32>,
}

#[async_trait]
impl ContainerRuntime for Recorder {
    async fn build_image(&self, request: BuildRequest<'_>) -> proto_gen::Result<EnvironmentHandle> {
        self.scripts.lock().unwrap().push(request.script.to_string());
        Ok(EnvironmentHandle::new("sha256:scenario".to_string()))
    }

    async fn run(
        &self,
        handle: &EnvironmentHandle,
        mount: &HostMount,
        args: &[String],
    ) -> proto_gen::Result<InvocationResult> {
        self.runs
            .lock()
            .unwrap()
            .push((handle.id().to_string(), mount.volume_arg(), args.to_vec()));
        Ok(InvocationResult::from_code(Some(self.exit_code.unwrap_or(0))))
    }
}

fn scenario_repo() -> tempfile::TempDir {
    let tmp = tempfile::tempdir().unwrap();
    for (rel, body) in [
        ("proto/a/msg.proto", "syntax = \"proto3\";\npackage a;\noption go_package = \"example.com/gen/a\";\n"),
        ("proto/b/msg.proto", "syntax = \"proto3\";\npackage b;\noption go_package = \"example.com/gen/b\";\n"),
        ("proto/doc.go", "package proto\n"),
    ] {
        let path = tmp.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, body).unwrap();
    }
    tmp
}

#[tokio::test]
async fn discovery_compiles_both_packages_in_one_invocation() {
    let repo = scenario_repo();
    let root = repo.path().display().to_string();
    let runtime = Recorder::default();
    let mount = HostMount::new(repo.path()).unwrap();
    let mut orchestrator = Orchestrator::new(&runtime, mount, GenConfig::default(), PINNED_ENVIRONMENT);

    orchestrator.run(RunMode::Discovery).await.unwrap();

    assert_eq!(*runtime.scripts.lock().unwrap(), vec![PINNED_ENVIRONMENT.render()]);

    let runs = runtime.runs.lock().unwrap();
    assert_eq!(runs.len(), 1);
    let (image, volume, args) = &runs[0];
    assert_eq!(image, "sha256:scenario");
    assert_eq!(volume, &format!("{root}:{root}"));
    assert_eq!(
        args,
        &vec![
            format!("--proto_path={root}/proto"),
            format!("--go_out={root}"),
            format!("--twirp_out={root}"),
            "--go_opt=paths=source_relative".to_string(),
            format!("{root}/proto/a/msg.proto"),
            format!("{root}/proto/b/msg.proto"),
        ]
    );
    assert_eq!(orchestrator.state(), RunState::Done { invocations: 1 });
}

#[tokio::test]
async fn compiler_failure_surfaces_exit_status() {
    let repo = scenario_repo();
    let runtime = Recorder { exit_code: Some(1), ..Recorder::default() };
    let mount = HostMount::new(repo.path()).unwrap();
    let mut orchestrator = Orchestrator::new(&runtime, mount, GenConfig::default(), PINNED_ENVIRONMENT);

    let err = orchestrator.run(RunMode::Discovery).await.unwrap_err();

    assert!(matches!(err, GenError::Invocation { status: Some(1) }));
    assert_eq!(orchestrator.state(), RunState::Failed { completed: 0 });
}

#[tokio::test]
async fn explicit_arguments_reach_the_compiler_untouched() {
    let repo = tempfile::tempdir().unwrap();
    let runtime = Recorder::default();
    let mount = HostMount::new(repo.path()).unwrap();
    let mut orchestrator = Orchestrator::new(&runtime, mount, GenConfig::default(), PINNED_ENVIRONMENT);
    let args: Vec<String> = ["--proto_path=/x", "--go_out=/y", "/x/a.proto"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    orchestrator.run(RunMode::from_args(args.clone())).await.unwrap();

    let runs = runtime.runs.lock().unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].2, args);
}
