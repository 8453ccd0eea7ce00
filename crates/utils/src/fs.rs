//! Filesystem helpers for materializing outputs

use remex_core::{Error, Result};
use std::path::{Component, Path, PathBuf};

/// Join a relative path declared by the server onto a destination root
///
/// Absolute paths and `..` components are rejected so that nothing is
/// written outside `root`.
pub fn join_relative(root: &Path, relative: &str) -> Result<PathBuf> {
    let candidate = Path::new(relative);
    let mut joined = root.to_path_buf();
    for component in candidate.components() {
        match component {
            Component::Normal(part) => joined.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                return Err(Error::invalid_path(relative, "path escapes the output root"));
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(Error::invalid_path(relative, "path must be relative"));
            }
        }
    }
    Ok(joined)
}

/// Validate a single directory entry name from an output tree
pub fn validate_entry_name(name: &str) -> Result<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains('/') || name.contains('\\')
    {
        return Err(Error::invalid_path(name, "not a valid directory entry name"));
    }
    Ok(())
}

/// Create a directory and all of its parents
pub async fn create_dir_all(path: &Path) -> Result<()> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|e| Error::local_io(path, "create directory", e))
}

/// Create the parent directories of a file path
pub async fn ensure_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => create_dir_all(parent).await,
        _ => Ok(()),
    }
}

/// Apply permission bits to a path
#[cfg(unix)]
pub async fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
        .await
        .map_err(|e| Error::local_io(path, "set permissions on", e))
}

#[cfg(not(unix))]
pub async fn set_mode(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}
