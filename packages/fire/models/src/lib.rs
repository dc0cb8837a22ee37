#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Fire perimeter record, aggregate, and summary types.
//!
//! These types are shared by the aggregation engine, the `DuckDB` feature
//! workspace, and the analysis pipeline. Records are read-only snapshots of
//! the perimeter dataset; totals are transient; summary rows are appended
//! once and never mutated.

pub mod progress;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Seconds in one day, used to floor durations to whole days.
const SECONDS_PER_DAY: i64 = 86_400;

/// One observed fire perimeter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FireRecord {
    /// Feature identifier within its subset.
    pub fid: i64,
    /// Fire year, if the source carries one.
    pub year: Option<i32>,
    /// Burned area in acres.
    pub acres: Option<f64>,
    /// Alarm (start) date.
    pub alarm: Option<NaiveDateTime>,
    /// Containment (end) date.
    pub containment: Option<NaiveDateTime>,
}

impl FireRecord {
    /// Burn duration in whole days, floored.
    ///
    /// Returns `None` when either date is missing. Inverted dates produce a
    /// negative duration.
    #[must_use]
    pub fn duration_days(&self) -> Option<i64> {
        let (start, end) = (self.alarm?, self.containment?);
        Some((end - start).num_seconds().div_euclid(SECONDS_PER_DAY))
    }
}

/// Accumulated totals over a set of [`FireRecord`]s.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateTotals {
    /// Sum of present acreage values.
    pub total_acres: f64,
    /// Sum of per-record durations in days. Negative if inverted dates
    /// outweigh the rest.
    pub total_days: i64,
    /// Number of records scanned.
    pub records: u64,
    /// Number of records that contributed a duration.
    pub dated_records: u64,
}

impl AggregateTotals {
    /// Total days as a real number, for percentage math and table output.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn total_days_f64(&self) -> f64 {
        self.total_days as f64
    }
}

/// One summary table row for a year of interest.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRow {
    /// Fire year.
    pub year: i32,
    /// Acres burnt in this year.
    pub acres_burnt: f64,
    /// Burn days in this year.
    pub burn_days: f64,
    /// Share of the dataset's total acres.
    pub percent_of_total_acres: f64,
    /// Share of the dataset's total burn days.
    pub percent_of_total_days: f64,
}

/// A single record's share of its own year's totals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordShare {
    /// Feature identifier of the record.
    pub fid: i64,
    /// Record acres as a percentage of the year's acres.
    pub percent_of_year_acres: f64,
    /// Record duration as a percentage of the year's burn days.
    pub percent_of_year_days: f64,
}

/// How the aggregation engine treats records with absent fields.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MissingFieldPolicy {
    /// Absent acreage or dates contribute zero.
    #[default]
    Skip,
    /// Absent acreage or dates abort the aggregation.
    Fail,
}

/// Property names in the source dataset that carry the fields the
/// aggregation needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldMapping {
    /// Fire year property.
    pub year: String,
    /// Burned acreage property.
    pub acres: String,
    /// Alarm (start) date property.
    pub alarm_date: String,
    /// Containment (end) date property.
    pub containment_date: String,
}

impl Default for FieldMapping {
    fn default() -> Self {
        Self {
            year: "YEAR_".to_string(),
            acres: "GIS_ACRES".to_string(),
            alarm_date: "ALARM_DATE".to_string(),
            containment_date: "CONT_DATE".to_string(),
        }
    }
}

/// Which fire years to process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum YearSelection {
    /// An explicit list of years.
    List {
        /// Years in processing order.
        list: Vec<i32>,
    },
    /// An inclusive `[start, end]` range.
    Range {
        /// First year.
        start: i32,
        /// Last year (inclusive).
        end: i32,
    },
}

impl Default for YearSelection {
    fn default() -> Self {
        Self::List {
            list: vec![2019, 2020],
        }
    }
}

impl YearSelection {
    /// Resolves the selection to distinct years in processing order.
    ///
    /// # Errors
    ///
    /// Returns an error if a range has `start > end` or a list is empty.
    pub fn years(&self) -> Result<Vec<i32>, InvalidYearSelectionError> {
        match self {
            Self::List { list } => {
                if list.is_empty() {
                    return Err(InvalidYearSelectionError::Empty);
                }
                let mut years = Vec::with_capacity(list.len());
                for year in list {
                    if !years.contains(year) {
                        years.push(*year);
                    }
                }
                Ok(years)
            }
            Self::Range { start, end } => {
                if start > end {
                    return Err(InvalidYearSelectionError::InvertedRange {
                        start: *start,
                        end: *end,
                    });
                }
                Ok((*start..=*end).collect())
            }
        }
    }

    /// Returns `true` if this selection was given as a range.
    #[must_use]
    pub const fn is_range(&self) -> bool {
        matches!(self, Self::Range { .. })
    }
}

/// Error returned when a [`YearSelection`] cannot be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidYearSelectionError {
    /// The year list was empty.
    Empty,
    /// The range start is after its end.
    InvertedRange {
        /// Range start.
        start: i32,
        /// Range end.
        end: i32,
    },
}

impl std::fmt::Display for InvalidYearSelectionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "no years of interest given"),
            Self::InvertedRange { start, end } => {
                write!(f, "invalid year range {start}..={end}: start is after end")
            }
        }
    }
}

impl std::error::Error for InvalidYearSelectionError {}

/// Conceptualization of spatial relationships for the hot-spot statistic.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Conceptualization {
    /// Polygons sharing an edge or a corner are neighbors.
    #[default]
    ContiguityEdgesCorners,
    /// Polygons sharing an edge are neighbors.
    ContiguityEdgesOnly,
    /// Features within a distance band are neighbors.
    FixedDistanceBand,
    /// Influence decays with distance.
    InverseDistance,
    /// Influence decays with squared distance.
    InverseDistanceSquared,
    /// The k closest features are neighbors.
    KNearestNeighbors,
}

/// Distance metric for the hot-spot statistic.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum DistanceMethod {
    /// Straight-line distance.
    #[default]
    EuclideanDistance,
    /// City-block distance.
    ManhattanDistance,
}

/// A request to run the hot-spot statistic over a named feature subset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotSpotRequest {
    /// Input feature subset.
    pub input: String,
    /// Numeric field analysed.
    pub field: String,
    /// Output feature subset, annotated with cluster classification.
    pub output: String,
    /// Spatial relationship conceptualization.
    pub conceptualization: Conceptualization,
    /// Distance metric.
    pub distance_method: DistanceMethod,
}
