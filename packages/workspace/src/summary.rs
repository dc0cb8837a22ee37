//! Append-only yearly summary tables.

use duckdb::params;
use fire_perimeter_models::SummaryRow;

use crate::{FeatureWorkspace, WorkspaceError, quote_ident};

impl FeatureWorkspace {
    /// Creates (or replaces) summary table `name` with the five summary
    /// columns.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceError`] if the name is invalid or the DDL fails.
    pub fn create_summary_table(&self, name: &str) -> Result<(), WorkspaceError> {
        let quoted = quote_ident(name)?;
        self.conn().execute_batch(&format!(
            "CREATE OR REPLACE TABLE {quoted} (
                year INTEGER NOT NULL,
                acres_burnt DOUBLE NOT NULL,
                burn_days DOUBLE NOT NULL,
                percent_of_total_acres DOUBLE NOT NULL,
                percent_of_total_days DOUBLE NOT NULL
            );"
        ))?;
        log::info!("Created summary table '{name}'");
        Ok(())
    }

    /// Appends one row to summary table `name`.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceError`] if the table is missing or the insert fails.
    pub fn append_summary_row(&self, name: &str, row: &SummaryRow) -> Result<(), WorkspaceError> {
        let quoted = self.existing(name)?;
        self.conn().execute(
            &format!(
                "INSERT INTO {quoted} (
                    year, acres_burnt, burn_days,
                    percent_of_total_acres, percent_of_total_days
                ) VALUES (?, ?, ?, ?, ?)"
            ),
            params![
                row.year,
                row.acres_burnt,
                row.burn_days,
                row.percent_of_total_acres,
                row.percent_of_total_days,
            ],
        )?;
        Ok(())
    }

    /// Reads summary table `name` back in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceError`] if the table is missing or the query fails.
    pub fn summary_rows(&self, name: &str) -> Result<Vec<SummaryRow>, WorkspaceError> {
        let quoted = self.existing(name)?;
        let mut stmt = self.conn().prepare(&format!(
            "SELECT year, acres_burnt, burn_days, percent_of_total_acres, percent_of_total_days
             FROM {quoted} ORDER BY rowid"
        ))?;
        let mut rows = stmt.query([])?;

        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(SummaryRow {
                year: row.get(0)?,
                acres_burnt: row.get(1)?,
                burn_days: row.get(2)?,
                percent_of_total_acres: row.get(3)?,
                percent_of_total_days: row.get(4)?,
            });
        }

        Ok(out)
    }
}
