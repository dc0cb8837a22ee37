//! Summary table output: CSV export and a plain-text table for the
//! terminal.

use std::fmt::Write as _;
use std::io::Write;

use fire_perimeter_models::{AggregateTotals, SummaryRow};

use crate::AnalysisError;

/// CSV column headers, in output order.
pub const CSV_HEADERS: [&str; 5] = [
    "Year",
    "AcresBurnt",
    "BurnDays",
    "PercentOfTotalAcres",
    "PercentOfTotalDays",
];

/// Writes `rows` as CSV with a header line.
///
/// # Errors
///
/// Returns [`AnalysisError::Csv`] if writing fails.
pub fn write_csv<W: Write>(rows: &[SummaryRow], writer: W) -> Result<(), AnalysisError> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(CSV_HEADERS)?;
    for row in rows {
        csv.write_record([
            row.year.to_string(),
            row.acres_burnt.to_string(),
            row.burn_days.to_string(),
            row.percent_of_total_acres.to_string(),
            row.percent_of_total_days.to_string(),
        ])?;
    }
    csv.flush()?;
    Ok(())
}

/// Renders `rows` as an aligned text table.
#[must_use]
pub fn format_table(rows: &[SummaryRow]) -> String {
    let mut out = format!(
        "{:>6}  {:>14}  {:>9}  {:>8}  {:>8}\n",
        "Year", "Acres", "Days", "% Acres", "% Days"
    );
    for row in rows {
        let _ = writeln!(
            out,
            "{:>6}  {:>14.2}  {:>9}  {:>8.2}  {:>8.2}",
            row.year,
            row.acres_burnt,
            row.burn_days,
            row.percent_of_total_acres,
            row.percent_of_total_days,
        );
    }
    out
}

/// Renders dataset totals as one line.
#[must_use]
pub fn format_totals(subset: &str, totals: &AggregateTotals) -> String {
    format!(
        "{subset}: {} records ({} dated), {:.2} acres, {} burn days",
        totals.records, totals.dated_records, totals.total_acres, totals.total_days
    )
}
