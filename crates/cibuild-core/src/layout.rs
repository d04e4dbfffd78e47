//! Filesystem layout of a CI run and idempotent directory helpers.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use crate::config::LibrarySettings;
use crate::error::{CiError, Result};

/// Fixed set of directories derived from the source root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildLayout {
    pub source_root: PathBuf,
    pub install_dir: PathBuf,
    pub build_dir: PathBuf,
    pub test_build_dir: PathBuf,
    /// Minimal project that consumes the installed package.
    pub consumer_project: PathBuf,
    /// Directory holding the documentation build helper.
    pub doc_dir: PathBuf,
}

impl BuildLayout {
    pub fn new(source_root: impl Into<PathBuf>, library: &LibrarySettings) -> Self {
        let source_root = source_root.into();
        BuildLayout {
            install_dir: source_root.join("_install"),
            build_dir: source_root.join("_build"),
            test_build_dir: source_root.join("_build_test"),
            consumer_project: source_root.join(&library.consumer_project),
            doc_dir: source_root.join("doc"),
            source_root,
        }
    }

    /// Use a different documentation helper directory.
    pub fn with_doc_dir(mut self, doc_dir: impl Into<PathBuf>) -> Self {
        self.doc_dir = doc_dir.into();
        self
    }

    /// CTest log written by `make test`.
    pub fn test_log(&self) -> PathBuf {
        self.build_dir
            .join("Testing")
            .join("Temporary")
            .join("LastTest.log")
    }

    /// Local clone of the publishing repository.
    pub fn publish_clone_dir(&self, repo: &str) -> PathBuf {
        self.source_root.join(repo)
    }
}

/// Create `dir` and its parents; an existing directory is not an error.
pub fn ensure_dir(dir: &Path) -> Result<()> {
    debug!(path = %dir.display(), "Ensuring directory exists");
    std::fs::create_dir_all(dir).map_err(|e| CiError::io(dir, e))
}

/// Remove `dir` recursively; a missing directory is not an error.
pub fn remove_dir_if_exists(dir: &Path) -> Result<()> {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => {
            debug!(path = %dir.display(), "Removed stale directory");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(CiError::io(dir, e)),
    }
}

/// Copy the tree at `src` to `dest`, skipping entries whose name starts
/// with a dot. Returns the number of files copied.
pub fn copy_tree_visible(src: &Path, dest: &Path) -> Result<usize> {
    ensure_dir(dest)?;
    let mut copied = 0;

    let entries = std::fs::read_dir(src).map_err(|e| CiError::io(src, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| CiError::io(src, e))?;
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }

        let from = entry.path();
        let to = dest.join(entry.file_name());
        let file_type = entry.file_type().map_err(|e| CiError::io(&from, e))?;
        if file_type.is_dir() {
            copied += copy_tree_visible(&from, &to)?;
        } else {
            std::fs::copy(&from, &to).map_err(|e| CiError::io(&from, e))?;
            copied += 1;
        }
    }

    Ok(copied)
}
