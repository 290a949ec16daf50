// src/sys/discovery.rs

use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::debug;

use crate::config::Grouping;
use crate::error::{GenError, Result};

pub const SCHEMA_EXTENSION: &str = ".proto";

/// One discovered schema file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaFile {
    /// Path relative to the working directory, as walked (`proto/a/msg.proto`).
    pub relative: PathBuf,
    /// Absolute host path; identical inside the container.
    pub absolute: PathBuf,
}

/// Files that go to protoc together in one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageGroup {
    /// Package name, or `dir:<relative dir>` for files that declare none.
    /// `None` when everything was lumped into a single group.
    pub key: Option<String>,
    pub files: Vec<SchemaFile>,
}

/// Header fields read from a schema file without parsing it.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SchemaHeader {
    pub package: Option<String>,
    pub go_package: Option<String>,
}

fn package_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^\s*package\s+([A-Za-z_][A-Za-z0-9_.]*)\s*;").expect("static regex")
    })
}

fn go_package_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?m)^\s*option\s+go_package\s*=\s*"([^"]*)"\s*;"#).expect("static regex")
    })
}

impl SchemaHeader {
    pub fn scan(source: &str) -> Self {
        Self {
            package: package_re().captures(source).map(|c| c[1].to_string()),
            go_package: go_package_re().captures(source).map(|c| c[1].to_string()),
        }
    }
}

// ==============================================================================
// 1. Traversal
// ==============================================================================

/// Walks `input_root` (relative to `cwd`) depth-first, entries in lexical
/// order, and returns every file whose name ends in `.proto`.
pub fn discover(cwd: &Path, input_root: &Path) -> Result<Vec<SchemaFile>> {
    let root = cwd.join(input_root);
    if !root.is_dir() {
        // A missing root is a layout problem, same as an empty one.
        return Err(GenError::NoInputsFound(root));
    }

    let mut found = Vec::new();
    walk(cwd, input_root, &mut found)?;

    if found.is_empty() {
        return Err(GenError::NoInputsFound(root));
    }
    Ok(found)
}

fn walk(cwd: &Path, relative_dir: &Path, found: &mut Vec<SchemaFile>) -> Result<()> {
    let dir = cwd.join(relative_dir);
    let read_err = |source| GenError::Read { path: dir.clone(), source };
    let mut entries = std::fs::read_dir(&dir)
        .map_err(read_err)?
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(read_err)?;

    // read_dir order is filesystem-dependent; sort for a stable walk.
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let relative = relative_dir.join(entry.file_name());
        let file_type = entry.file_type().map_err(read_err)?;

        if file_type.is_dir() {
            walk(cwd, &relative, found)?;
        } else if entry.file_name().to_string_lossy().ends_with(SCHEMA_EXTENSION) {
            debug!(path = %relative.display(), "discovered schema file");
            found.push(SchemaFile {
                absolute: cwd.join(&relative),
                relative,
            });
        }
    }

    Ok(())
}

// ==============================================================================
// 2. Header Lint & Grouping
// ==============================================================================

/// Reads every file's header. Rejects relative `go_package` values, which the
/// Go plugins accept but then quietly skip service generation for.
pub fn scan_headers(files: &[SchemaFile]) -> Result<Vec<SchemaHeader>> {
    files
        .iter()
        .map(|file| {
            let bytes = std::fs::read(&file.absolute).map_err(|source| GenError::Read {
                path: file.absolute.clone(),
                source,
            })?;
            // protoc is the judge of encoding; the header lint only needs ASCII.
            let header = SchemaHeader::scan(&String::from_utf8_lossy(&bytes));
            if let Some(value) = &header.go_package {
                if value.starts_with("./") || value.starts_with("../") {
                    return Err(GenError::InvalidGoPackage {
                        path: file.relative.clone(),
                        value: value.clone(),
                    });
                }
            }
            Ok(header)
        })
        .collect()
}

/// Splits `files` into groups, preserving traversal order both across groups
/// (order of first appearance) and within each group.
pub fn group(files: Vec<SchemaFile>, headers: &[SchemaHeader], grouping: Grouping) -> Vec<PackageGroup> {
    match grouping {
        Grouping::Single => vec![PackageGroup { key: None, files }],
        Grouping::ByPackage => {
            let mut groups: Vec<PackageGroup> = Vec::new();
            let mut index: HashMap<String, usize> = HashMap::new();

            for (file, header) in files.into_iter().zip(headers) {
                let key = match &header.package {
                    Some(pkg) => pkg.clone(),
                    None => {
                        let dir = file.relative.parent().unwrap_or_else(|| Path::new(""));
                        format!("dir:{}", dir.display())
                    }
                };

                match index.get(&key) {
                    Some(&i) => groups[i].files.push(file),
                    None => {
                        index.insert(key.clone(), groups.len());
                        groups.push(PackageGroup { key: Some(key), files: vec![file] });
                    }
                }
            }

            groups
        }
    }
}
