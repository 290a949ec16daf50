// src/invocation.rs

use std::path::{Path, PathBuf};

use crate::environment::Plugin;
use crate::sys::discovery::PackageGroup;
use crate::sys::mount::HostMount;

/// The complete argv for one protoc run, already in container-visible form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationRequest {
    pub args: Vec<String>,
    /// Discovered inputs relative to the working directory, for progress
    /// logging. Empty in explicit mode.
    pub sources: Vec<PathBuf>,
}

impl InvocationRequest {
    /// Caller-supplied flags, forwarded verbatim. With the identity mount an
    /// absolute `$(pwd)/...` argument already means the same path in the
    /// container, so nothing is rewritten.
    pub fn explicit(args: Vec<String>) -> Self {
        Self { args, sources: Vec::new() }
    }

    /// Derived flags for a discovered group:
    /// `--proto_path=<cwd>/<root>`, one `--<plugin>_out=<cwd>` per plugin,
    /// `--<plugin>_opt=...` where the plugin supports source-relative naming,
    /// then each input file by absolute path.
    pub fn for_group(mount: &HostMount, input_root: &Path, plugins: &[Plugin], group: &PackageGroup) -> Self {
        let out_root = mount.root().display().to_string();

        let mut args = vec![format!("--proto_path={}", mount.env_arg(input_root))];
        for plugin in plugins {
            args.push(format!("--{}_out={}", plugin.name, out_root));
        }
        for plugin in plugins {
            if let Some(opt) = plugin.source_relative_opt {
                args.push(format!("--{}_opt={}", plugin.name, opt));
            }
        }
        for file in &group.files {
            args.push(mount.env_arg(&file.absolute));
        }

        let sources = group.files.iter().map(|f| f.relative.clone()).collect();

        Self { args, sources }
    }
}
