#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! `DuckDB` feature workspace for fire perimeter analysis.
//!
//! A workspace is a single `DuckDB` file holding named feature subsets
//! (one table per subset, geometry kept as `GeoJSON` TEXT) and summary
//! tables. It plays the role of the geodatabase the analysis reads from
//! and writes to: attribute selection, feature copy, merge, delete, and
//! append-only summary tables are all plain SQL here.

pub mod dates;
pub mod export;
pub mod import;
pub mod paths;
pub mod subsets;
pub mod summary;

use std::path::{Path, PathBuf};

use duckdb::Connection;
use thiserror::Error;

/// Errors that can occur during workspace operations.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    /// `DuckDB` operation failed.
    #[error("Database error: {0}")]
    Database(#[from] duckdb::Error),

    /// Filesystem operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// `GeoJSON` parsing failed.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// The `GeoJSON` document is not a feature or feature collection.
    #[error("Unsupported GeoJSON: {message}")]
    UnsupportedGeoJson {
        /// Description of what was found instead.
        message: String,
    },

    /// A subset or table name is not a plain identifier.
    #[error("Invalid subset name '{name}': expected [A-Za-z_][A-Za-z0-9_]*")]
    InvalidName {
        /// The rejected name.
        name: String,
    },

    /// A referenced subset or table does not exist.
    #[error("Subset '{name}' does not exist")]
    MissingSubset {
        /// The missing name.
        name: String,
    },

    /// A merge was requested with no inputs.
    #[error("Merge requires at least one input subset")]
    EmptyMerge,
}

/// A `DuckDB`-backed feature workspace.
pub struct FeatureWorkspace {
    conn: Connection,
    path: Option<PathBuf>,
}

impl FeatureWorkspace {
    /// Opens (or creates) the workspace at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceError`] if the parent directory cannot be created
    /// or the database cannot be opened.
    pub fn open(path: &Path) -> Result<Self, WorkspaceError> {
        if let Some(parent) = path.parent() {
            paths::ensure_dir(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("SET threads = 4; SET memory_limit = '512MB';")?;

        log::debug!("Opened feature workspace {}", path.display());

        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    /// Opens a throwaway in-memory workspace.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceError`] if `DuckDB` cannot allocate the database.
    pub fn open_in_memory() -> Result<Self, WorkspaceError> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
            path: None,
        })
    }

    /// Path of the backing file, or `None` for in-memory workspaces.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Directory for files exchanged with external tools.
    ///
    /// Sits next to the workspace file, or under the system temp directory
    /// for in-memory workspaces.
    #[must_use]
    pub fn exchange_dir(&self) -> PathBuf {
        self.path
            .as_deref()
            .and_then(Path::parent)
            .map_or_else(
                || std::env::temp_dir().join("fire_perimeter_exchange"),
                |parent| parent.join("exchange"),
            )
    }

    pub(crate) const fn conn(&self) -> &Connection {
        &self.conn
    }
}

/// Validates that `name` can be used as an unquoted table identifier and
/// returns it double-quoted for SQL.
///
/// # Errors
///
/// Returns [`WorkspaceError::InvalidName`] for anything other than
/// `[A-Za-z_][A-Za-z0-9_]*`.
pub fn quote_ident(name: &str) -> Result<String, WorkspaceError> {
    let mut chars = name.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid {
        Ok(format!("\"{name}\""))
    } else {
        Err(WorkspaceError::InvalidName {
            name: name.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_plain_identifiers() {
        assert_eq!(quote_ident("fires_2019").unwrap(), "\"fires_2019\"");
        assert_eq!(quote_ident("_tmp").unwrap(), "\"_tmp\"");
    }

    #[test]
    fn rejects_unsafe_identifiers() {
        for name in ["", "2019_fires", "fires-2019", "a\"; DROP TABLE x; --", "fires 2019"] {
            assert!(
                matches!(quote_ident(name), Err(WorkspaceError::InvalidName { .. })),
                "accepted {name:?}"
            );
        }
    }

    #[test]
    fn in_memory_workspace_has_no_path() {
        let ws = FeatureWorkspace::open_in_memory().unwrap();
        assert!(ws.path().is_none());
        assert!(ws.exchange_dir().ends_with("fire_perimeter_exchange"));
    }
}
