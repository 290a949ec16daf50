// src/sys/mount.rs

use std::path::{Path, PathBuf};

use crate::error::{GenError, Result};

/// The host working directory, bind-mounted into the container at the same
/// absolute path. Because source == target, any absolute host path under the
/// root means the same file on both sides of the boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostMount {
    root: PathBuf,
}

impl HostMount {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_absolute() {
            return Err(GenError::WorkingDirectory(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("mount root {} is not absolute", root.display()),
            )));
        }
        Ok(Self { root })
    }

    /// Resolves the process working directory.
    pub fn current() -> Result<Self> {
        let cwd = std::env::current_dir().map_err(GenError::WorkingDirectory)?;
        Self::new(cwd)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `-v` value: `<root>:<root>`.
    pub fn volume_arg(&self) -> String {
        let root = self.root.display();
        format!("{}:{}", root, root)
    }

    /// Path as protoc will see it inside the container. Absolute paths pass
    /// through untouched; relative ones are anchored at the mount root.
    pub fn to_environment(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    /// Same as [`to_environment`](Self::to_environment), rendered for argv.
    pub fn env_arg(&self, path: &Path) -> String {
        self.to_environment(path).display().to_string()
    }
}
