// src/config.rs

use std::env;
use std::path::{Component, Path};

use crate::error::{GenError, Result};

/// How discovered schema files are split across protoc invocations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Grouping {
    /// One invocation for every discovered file. Known limitation: files from
    /// different packages share a single plugin run.
    Single,
    /// One invocation per `package` declaration.
    ByPackage,
}

impl Grouping {
    fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "single" => Ok(Grouping::Single),
            "package" => Ok(Grouping::ByPackage),
            other => Err(GenError::Config(format!(
                "PROTO_GEN_GROUPING must be 'single' or 'package', got '{}'",
                other
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(GenError::Config(format!(
                "PROTO_GEN_LOG_FORMAT must be 'text' or 'json', got '{}'",
                other
            ))),
        }
    }
}

#[derive(Clone, Debug)]
pub struct GenConfig {
    // 🐳 Container runtime executable
    pub docker_bin: String,

    // 📂 Discovery root, relative to the working directory
    pub input_root: String,

    pub grouping: Grouping,
    pub log_format: LogFormat,
}

impl Default for GenConfig {
    fn default() -> Self {
        Self {
            docker_bin: "docker".to_string(),
            input_root: "proto".to_string(),
            grouping: Grouping::Single,
            log_format: LogFormat::Text,
        }
    }
}

impl GenConfig {
    /// Reads the process environment.
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup. Unset keys take their
    /// default; set-but-invalid keys are an error, never a silent fallback.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let input_root = lookup("PROTO_GEN_INPUT_ROOT").unwrap_or(defaults.input_root);
        validate_input_root(&input_root)?;

        let grouping = match lookup("PROTO_GEN_GROUPING") {
            Some(raw) => Grouping::parse(&raw)?,
            None => defaults.grouping,
        };

        let log_format = match lookup("PROTO_GEN_LOG_FORMAT") {
            Some(raw) => LogFormat::parse(&raw)?,
            None => defaults.log_format,
        };

        Ok(Self {
            docker_bin: lookup("PROTO_GEN_DOCKER").unwrap_or(defaults.docker_bin),
            input_root,
            grouping,
            log_format,
        })
    }
}

/// The root must stay under the working directory: the container only sees
/// the `<cwd>:<cwd>` mount, so absolute or `..` paths would point protoc at
/// files it cannot open.
pub(crate) fn validate_input_root(raw: &str) -> Result<()> {
    if raw.trim().is_empty() {
        return Err(GenError::Config("PROTO_GEN_INPUT_ROOT must not be empty".into()));
    }
    let path = Path::new(raw);
    if path.has_root() {
        return Err(GenError::Config(format!(
            "PROTO_GEN_INPUT_ROOT must be relative to the working directory, got '{}'",
            raw
        )));
    }
    if path.components().any(|c| matches!(c, Component::ParentDir)) {
        return Err(GenError::Config(format!(
            "PROTO_GEN_INPUT_ROOT must not leave the working directory, got '{}'",
            raw
        )));
    }
    Ok(())
}
