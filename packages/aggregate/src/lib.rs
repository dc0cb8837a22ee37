#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Fire statistics aggregation.
//!
//! Every function here is a pure reduction over an already-materialized
//! slice of [`FireRecord`]s. Per-year totals are produced by a fresh call
//! over that year's records, so no counter can leak from one year into the
//! next.

use fire_perimeter_models::{
    AggregateTotals, FireRecord, MissingFieldPolicy, RecordShare, SummaryRow,
};
use thiserror::Error;

/// Errors that can occur during aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregateError {
    /// A record lacks a field and the policy is [`MissingFieldPolicy::Fail`].
    #[error("Record {fid} is missing {field}")]
    MissingField {
        /// Feature identifier of the offending record.
        fid: i64,
        /// Which field is missing.
        field: &'static str,
    },
}

/// Sums acreage and burn days over `records`.
///
/// With [`MissingFieldPolicy::Skip`], absent acreage contributes zero and a
/// record missing either date contributes zero days (its acreage still
/// counts). With [`MissingFieldPolicy::Fail`], the first such record aborts.
///
/// # Errors
///
/// Returns [`AggregateError::MissingField`] only under
/// [`MissingFieldPolicy::Fail`].
pub fn compute_totals(
    records: &[FireRecord],
    policy: MissingFieldPolicy,
) -> Result<AggregateTotals, AggregateError> {
    let mut totals = AggregateTotals::default();
    let mut skipped = 0u64;

    for record in records {
        totals.records += 1;

        match record.acres {
            Some(acres) => totals.total_acres += acres,
            None => {
                if policy == MissingFieldPolicy::Fail {
                    return Err(AggregateError::MissingField {
                        fid: record.fid,
                        field: "acres",
                    });
                }
                skipped += 1;
            }
        }

        if let Some(days) = record.duration_days() {
            totals.total_days += days;
            totals.dated_records += 1;
        } else if policy == MissingFieldPolicy::Fail {
            let field = if record.alarm.is_none() {
                "alarm date"
            } else {
                "containment date"
            };
            return Err(AggregateError::MissingField {
                fid: record.fid,
                field,
            });
        }
    }

    if skipped > 0 || totals.dated_records < totals.records {
        log::debug!(
            "Aggregated {} records: {skipped} without acreage, {} without a full date pair",
            totals.records,
            totals.records - totals.dated_records,
        );
    }

    Ok(totals)
}

/// Returns `part` as a percentage of `whole`.
///
/// Returns `0` when `whole` is zero or absent. The result is not clamped,
/// so an inconsistent baseline can yield values above 100 or below 0.
#[must_use]
pub fn compute_percentage(part: f64, whole: Option<f64>) -> f64 {
    match whole {
        Some(whole) if whole != 0.0 => (part / whole) * 100.0,
        _ => 0.0,
    }
}

/// Combines one year's totals with the dataset-wide totals.
#[must_use]
pub fn build_summary_row(
    year: i32,
    year_totals: &AggregateTotals,
    grand_totals: &AggregateTotals,
) -> SummaryRow {
    let burn_days = year_totals.total_days_f64();

    SummaryRow {
        year,
        acres_burnt: year_totals.total_acres,
        burn_days,
        percent_of_total_acres: compute_percentage(
            year_totals.total_acres,
            Some(grand_totals.total_acres),
        ),
        percent_of_total_days: compute_percentage(
            burn_days,
            Some(grand_totals.total_days_f64()),
        ),
    }
}

/// Computes each record's share of its year's totals.
///
/// A share is `0` when the year's total is not strictly positive. Records
/// without acreage get a `0` acreage share; records without both dates get
/// a `0` day share.
#[must_use]
pub fn record_shares(records: &[FireRecord], year_totals: &AggregateTotals) -> Vec<RecordShare> {
    let acres_base = (year_totals.total_acres > 0.0).then_some(year_totals.total_acres);
    let days_base = (year_totals.total_days > 0).then(|| year_totals.total_days_f64());

    records
        .iter()
        .map(|record| {
            #[allow(clippy::cast_precision_loss)]
            let percent_of_year_days = record
                .duration_days()
                .map_or(0.0, |days| compute_percentage(days as f64, days_base));

            RecordShare {
                fid: record.fid,
                percent_of_year_acres: record
                    .acres
                    .map_or(0.0, |acres| compute_percentage(acres, acres_base)),
                percent_of_year_days,
            }
        })
        .collect()
}
