// src/error.rs

use std::path::PathBuf;
use thiserror::Error;

/// Every failure in a proto-gen run. All of them are fatal: `main` logs the
/// message once and exits non-zero.
#[derive(Error, Debug)]
pub enum GenError {
    /// The current directory could not be resolved.
    #[error("cannot determine working directory: {0}")]
    WorkingDirectory(#[source] std::io::Error),

    /// The container runtime failed to build the pinned image.
    #[error("docker build failed: {0}")]
    EnvironmentBuild(String),

    /// Discovery mode walked the input root and found nothing to compile.
    #[error("found no .proto files under {}", .0.display())]
    NoInputsFound(PathBuf),

    /// protoc exited non-zero (or was killed by a signal).
    #[error("protoc command failed: {}", exit_description(.status))]
    Invocation { status: Option<i32> },

    /// A schema declares a relative `go_package`, which the plugins mishandle.
    #[error("{}: go_package {value:?} must be a full import path, not a relative one", .path.display())]
    InvalidGoPackage { path: PathBuf, value: String },

    /// An environment variable held a value we refuse to guess about.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A schema file or directory under the input root could not be read.
    #[error("cannot read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A subprocess could not be started at all.
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn exit_description(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("exit status {}", code),
        None => "terminated by signal".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, GenError>;
