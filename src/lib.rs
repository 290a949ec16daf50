//! Reproducible protoc code generation.
//!
//! `proto-gen` builds a container image with exact, pinned versions of
//! protoc and its Go plugins, then runs protoc inside it with the working
//! directory mounted at the same absolute path. Generated files land directly
//! in the host tree.
//!
//! Run it from the root of a repository whose `proto/` directory holds the
//! schema tree. With no arguments every `.proto` file under `proto/` is
//! compiled; with arguments, they are handed to protoc unchanged.
//!
//! There is no timeout on any subprocess: a hung image build or a hung protoc
//! hangs the tool. Killing the process may leave partially written output.

pub mod config;
pub mod environment;
pub mod error;
pub mod invocation;
pub mod logging;
pub mod orchestrator;
pub mod sys;

pub use config::{GenConfig, Grouping, LogFormat};
pub use environment::{EnvironmentBuilder, EnvironmentHandle, EnvironmentSpecification, PINNED_ENVIRONMENT};
pub use error::{GenError, Result};
pub use invocation::InvocationRequest;
pub use orchestrator::{Orchestrator, RunMode, RunState};
