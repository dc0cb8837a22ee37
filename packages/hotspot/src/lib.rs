#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Runs an external hot-spot (Getis-Ord Gi*) tool over exported perimeters.
//!
//! The statistic itself is not computed here. The configured program is
//! invoked as
//!
//! ```text
//! <program> [args..] --input <in.geojson> --field <field> --output <out.geojson>
//!     --conceptualization <CONCEPTUALIZATION> --distance-method <DISTANCE_METHOD>
//! ```
//!
//! and is expected to write a `GeoJSON` `FeatureCollection` whose features
//! carry the cluster classification (e.g. `GiZScore`, `GiPValue`, `Gi_Bin`).

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use fire_perimeter_models::{Conceptualization, DistanceMethod};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while running the external tool.
#[derive(Debug, Error)]
pub enum HotSpotError {
    /// The program could not be started.
    #[error("Failed to run hot spot tool '{program}': {source}")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The program exited unsuccessfully.
    #[error("Hot spot tool '{program}' exited with {status}")]
    ToolFailed {
        /// Program that failed.
        program: String,
        /// Exit status description.
        status: String,
    },

    /// The program succeeded but wrote no output file.
    #[error("Hot spot tool produced no output at {}", path.display())]
    MissingOutput {
        /// Expected output path.
        path: PathBuf,
    },
}

/// Invocation of one hot-spot run on files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HotSpotInvocation<'a> {
    /// Exported input features.
    pub input: &'a Path,
    /// Numeric field to analyse.
    pub field: &'a str,
    /// Where the tool must write its annotated features.
    pub output: &'a Path,
    /// Spatial relationship conceptualization.
    pub conceptualization: Conceptualization,
    /// Distance metric.
    pub distance_method: DistanceMethod,
}

/// An external hot-spot program and its fixed leading arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalHotSpotTool {
    /// Program to execute (looked up on `PATH`).
    pub program: String,
    /// Arguments placed before the generated ones.
    #[serde(default)]
    pub args: Vec<String>,
}

impl ExternalHotSpotTool {
    /// Creates a tool with no leading arguments.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Full argument list for `invocation`.
    #[must_use]
    pub fn command_args(&self, invocation: &HotSpotInvocation<'_>) -> Vec<OsString> {
        let mut args: Vec<OsString> = self.args.iter().map(OsString::from).collect();
        args.extend([
            "--input".into(),
            invocation.input.as_os_str().to_owned(),
            "--field".into(),
            invocation.field.into(),
            "--output".into(),
            invocation.output.as_os_str().to_owned(),
            "--conceptualization".into(),
            invocation.conceptualization.to_string().into(),
            "--distance-method".into(),
            invocation.distance_method.to_string().into(),
        ]);
        args
    }

    /// Runs the tool and waits for it to finish.
    ///
    /// Any stale output file is removed first so a tool that exits cleanly
    /// without writing is reported as [`HotSpotError::MissingOutput`].
    ///
    /// # Errors
    ///
    /// Returns [`HotSpotError`] if the program cannot start, exits with a
    /// failure status, or writes no output.
    pub fn run(&self, invocation: &HotSpotInvocation<'_>) -> Result<(), HotSpotError> {
        if invocation.output.exists()
            && let Err(e) = std::fs::remove_file(invocation.output)
        {
            log::warn!(
                "Could not remove stale hot spot output {}: {e}",
                invocation.output.display()
            );
        }

        log::info!(
            "Running hot spot tool '{}' on {} (field {}, {}, {})",
            self.program,
            invocation.input.display(),
            invocation.field,
            invocation.conceptualization,
            invocation.distance_method,
        );

        let status = Command::new(&self.program)
            .args(self.command_args(invocation))
            .status()
            .map_err(|source| HotSpotError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !status.success() {
            return Err(HotSpotError::ToolFailed {
                program: self.program.clone(),
                status: status.to_string(),
            });
        }

        if !invocation.output.exists() {
            return Err(HotSpotError::MissingOutput {
                path: invocation.output.to_path_buf(),
            });
        }

        log::info!("Hot spot analysis complete: {}", invocation.output.display());
        Ok(())
    }
}
