#![allow(clippy::module_name_repetitions)]
//! Canonical file paths for the workspace data directory.

use std::path::{Path, PathBuf};

/// Environment variable overriding the default workspace file.
pub const WORKSPACE_ENV: &str = "FIRE_WORKSPACE";

/// Returns the project root directory.
///
/// Resolved at compile time from `CARGO_MANIFEST_DIR`, falling back to the
/// current directory when the layout is not the expected one.
#[must_use]
pub fn project_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .ancestors()
        .nth(2)
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

/// Returns the `data/` directory path.
#[must_use]
pub fn data_dir() -> PathBuf {
    project_root().join("data")
}

/// Returns the workspace file path: `$FIRE_WORKSPACE` if set, otherwise
/// `data/fire_workspace.duckdb`.
#[must_use]
pub fn default_workspace_path() -> PathBuf {
    std::env::var_os(WORKSPACE_ENV)
        .filter(|v| !v.is_empty())
        .map_or_else(|| data_dir().join("fire_workspace.duckdb"), PathBuf::from)
}

/// Ensures a directory exists, creating it if necessary.
///
/// # Errors
///
/// Returns an I/O error if the directory cannot be created.
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.as_os_str().is_empty() && !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}
