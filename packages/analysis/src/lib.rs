#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Fire perimeter statistics pipeline.
//!
//! Computes dataset-wide totals, selects each year of interest into its
//! own feature subset, appends one summary row per year, merges the yearly
//! subsets, and hands the merged subset to an external hot-spot statistic.
//!
//! The pipeline talks to its storage and to the statistic through the
//! traits in [`collaborators`], implemented for the `DuckDB`
//! [`fire_perimeter_workspace::FeatureWorkspace`].

pub mod cleanup;
pub mod collaborators;
pub mod commands;
pub mod config;
pub mod interactive;
pub mod pipeline;
pub mod report;

use fire_perimeter_aggregate::AggregateError;
use fire_perimeter_hotspot::HotSpotError;
use fire_perimeter_workspace::WorkspaceError;
use thiserror::Error;

/// Errors that can occur while running the analysis.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Feature workspace operation failed.
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),

    /// Aggregation rejected a record.
    #[error(transparent)]
    Aggregate(#[from] AggregateError),

    /// External hot spot tool failed.
    #[error(transparent)]
    HotSpot(#[from] HotSpotError),

    /// Configuration file could not be parsed.
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration is inconsistent.
    #[error("Config error: {message}")]
    Config {
        /// Description of what went wrong.
        message: String,
    },

    /// Filesystem operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV output failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A collaborator reported a failure outside the built-in backends.
    #[error("{message}")]
    Collaborator {
        /// Description of what went wrong.
        message: String,
    },
}
