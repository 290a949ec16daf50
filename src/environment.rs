// src/environment.rs

//! The pinned protoc image: its declarative description, the Dockerfile it
//! renders to, and the builder that turns it into a runnable image id.

use sha2::{Digest, Sha256};
use std::fmt;
use tracing::{debug, info};

use crate::error::Result;
use crate::sys::traits::{BuildRequest, ContainerRuntime};

// ==============================================================================
// 1. Environment Specification (Immutable, Hard-Pinned)
// ==============================================================================

/// An apt package pinned to an exact Debian version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OsPackage {
    pub name: &'static str,
    pub version: &'static str,
}

/// A protoc plugin installed with `go get <module>@<version>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Plugin {
    /// Short name protoc knows it by: `--<name>_out`.
    pub name: &'static str,
    pub module: &'static str,
    pub version: &'static str,
    /// `--<name>_opt` value for source-relative output paths, if supported.
    pub source_relative_opt: Option<&'static str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvironmentSpecification {
    pub base_image: &'static str,
    pub workdir: &'static str,
    pub os_packages: &'static [OsPackage],
    pub compiler_version: &'static str,
    pub compiler_url: &'static str,
    pub plugins: &'static [Plugin],
    pub entrypoint: &'static str,
}

/// Everything the image depends on, by exact version:
/// the golang base image (linux, go, git), protoc, the Go plugins, and unzip.
pub const PINNED_ENVIRONMENT: EnvironmentSpecification = EnvironmentSpecification {
    base_image: "golang:1.16.5",
    workdir: "/work",
    os_packages: &[OsPackage { name: "unzip", version: "6.0-23+deb10u2" }],
    compiler_version: "3.13.0",
    compiler_url: "https://github.com/protocolbuffers/protobuf/releases/download/v3.13.0/protoc-3.13.0-linux-x86_64.zip",
    plugins: &[
        Plugin {
            name: "go",
            module: "google.golang.org/protobuf/cmd/protoc-gen-go",
            version: "v1.20.0",
            source_relative_opt: Some("paths=source_relative"),
        },
        Plugin {
            name: "twirp",
            module: "github.com/twitchtv/twirp/protoc-gen-twirp",
            version: "v5.12.1+incompatible",
            source_relative_opt: None,
        },
    ],
    entrypoint: "protoc",
};

impl EnvironmentSpecification {
    /// Renders the Dockerfile. Only the pinned values are substituted; the
    /// layout of the script never changes between runs.
    pub fn render(&self) -> String {
        let packages = self
            .os_packages
            .iter()
            .map(|p| format!("{}={}", p.name, p.version))
            .collect::<Vec<_>>()
            .join(" ");

        let plugins = self
            .plugins
            .iter()
            .map(|p| format!("{}@{}", p.module, p.version))
            .collect::<Vec<_>>()
            .join(" \\\n           ");

        format!(
            r#"
FROM {base_image}

WORKDIR {workdir}

RUN apt-get update && \
    apt-get install -y {packages} && \
    curl --location --silent -o protoc.zip {compiler_url} && \
    unzip protoc.zip -d /usr/local/ && \
    rm -fr protoc.zip

RUN go get {plugins}

ENTRYPOINT ["{entrypoint}"]
"#,
            base_image = self.base_image,
            workdir = self.workdir,
            packages = packages,
            compiler_url = self.compiler_url,
            plugins = plugins,
            entrypoint = self.entrypoint,
        )
    }

    /// SHA-256 of the rendered Dockerfile, hex encoded.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.render().as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Human-facing tag: `proto-gen:<12 hex chars of digest>`.
    pub fn tag(&self) -> String {
        format!("proto-gen:{}", &self.digest()[..12])
    }
}

// ==============================================================================
// 2. Environment Handle
// ==============================================================================

/// Opaque id of a built image. Only lives for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentHandle {
    id: String,
}

impl EnvironmentHandle {
    pub fn new(id: String) -> Self {
        Self { id }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for EnvironmentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

// ==============================================================================
// 3. Environment Builder
// ==============================================================================

/// Turns a specification into an image id. Keeps no cache of its own; the
/// runtime's layer cache makes repeated builds of the same text cheap.
pub struct EnvironmentBuilder<'r> {
    runtime: &'r dyn ContainerRuntime,
}

impl<'r> EnvironmentBuilder<'r> {
    pub fn new(runtime: &'r dyn ContainerRuntime) -> Self {
        Self { runtime }
    }

    pub async fn materialize(&self, spec: EnvironmentSpecification) -> Result<EnvironmentHandle> {
        let script = spec.render();
        let tag = spec.tag();

        info!("building protoc container image...");
        debug!(tag = %tag, protoc = spec.compiler_version, "rendered environment specification");

        let handle = self
            .runtime
            .build_image(BuildRequest { script: &script, tag: Some(&tag) })
            .await?;

        debug!(image = %handle, "environment ready");
        Ok(handle)
    }
}
