//! Named feature subsets: selection, copy, merge, delete, and in-place
//! field population.

use duckdb::{Connection, params};
use fire_perimeter_models::{FireRecord, RecordShare};

use crate::dates::from_epoch_seconds;
use crate::{FeatureWorkspace, WorkspaceError, quote_ident};

/// Column added by [`FeatureWorkspace::annotate_shares`] for acreage shares.
pub const PERCENT_OF_YEAR_ACRES: &str = "percent_of_year_acres";
/// Column added by [`FeatureWorkspace::annotate_shares`] for day shares.
pub const PERCENT_OF_YEAR_DAYS: &str = "percent_of_year_days";

/// A feature subset and its size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubsetInfo {
    /// Subset name.
    pub name: String,
    /// Number of features.
    pub features: u64,
}

pub(crate) fn create_feature_table(conn: &Connection, quoted: &str) -> Result<(), WorkspaceError> {
    conn.execute_batch(&format!(
        "CREATE OR REPLACE TABLE {quoted} (
            fid BIGINT NOT NULL,
            year INTEGER,
            acres DOUBLE,
            alarm_epoch BIGINT,
            containment_epoch BIGINT,
            properties TEXT NOT NULL DEFAULT '{{}}',
            geometry TEXT
        );"
    ))?;
    Ok(())
}

impl FeatureWorkspace {
    /// Returns `true` if a table named `name` exists. Names match without
    /// regard to ASCII case, as `DuckDB` resolves them.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceError`] if the catalog query fails.
    pub fn subset_exists(&self, name: &str) -> Result<bool, WorkspaceError> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM information_schema.tables
             WHERE table_schema = 'main' AND lower(table_name) = lower(?)",
            params![name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Returns `true` if table `name` has a column named `column`.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceError`] if the catalog query fails.
    pub fn has_column(&self, name: &str, column: &str) -> Result<bool, WorkspaceError> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM information_schema.columns
             WHERE table_schema = 'main'
               AND lower(table_name) = lower(?)
               AND lower(column_name) = lower(?)",
            params![name, column],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Lists feature subsets (tables with a `geometry` column).
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceError`] if any query fails.
    pub fn list_subsets(&self) -> Result<Vec<SubsetInfo>, WorkspaceError> {
        let mut stmt = self.conn().prepare(
            "SELECT table_name FROM information_schema.columns
             WHERE table_schema = 'main' AND column_name = 'geometry'
             ORDER BY table_name",
        )?;
        let mut rows = stmt.query([])?;

        let mut names = Vec::new();
        while let Some(row) = rows.next()? {
            let name: String = row.get(0)?;
            names.push(name);
        }

        names
            .into_iter()
            .map(|name| {
                let features = self.count_features(&name)?;
                Ok(SubsetInfo { name, features })
            })
            .collect()
    }

    /// Counts the features in subset `name`.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceError`] if the subset is missing or the query fails.
    pub fn count_features(&self, name: &str) -> Result<u64, WorkspaceError> {
        let quoted = self.existing(name)?;
        let count: i64 = self
            .conn()
            .query_row(&format!("SELECT COUNT(*) FROM {quoted}"), [], |row| {
                row.get(0)
            })?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    /// Reads every record of subset `name`, ordered by feature id.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceError`] if the subset is missing or the query fails.
    pub fn read_records(&self, name: &str) -> Result<Vec<FireRecord>, WorkspaceError> {
        let quoted = self.existing(name)?;
        let mut stmt = self.conn().prepare(&format!(
            "SELECT fid, year, acres, alarm_epoch, containment_epoch
             FROM {quoted} ORDER BY fid"
        ))?;
        let mut rows = stmt.query([])?;

        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            let alarm: Option<i64> = row.get(3)?;
            let containment: Option<i64> = row.get(4)?;

            records.push(FireRecord {
                fid: row.get(0)?,
                year: row.get(1)?,
                acres: row.get(2)?,
                alarm: alarm.and_then(from_epoch_seconds),
                containment: containment.and_then(from_epoch_seconds),
            });
        }

        Ok(records)
    }

    /// Copies the features of `source` whose year equals `year` into a new
    /// subset `output`, replacing any existing subset of that name.
    ///
    /// Returns the number of features copied.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceError`] if `source` is missing, a name is invalid,
    /// or the copy fails.
    pub fn select_year(
        &self,
        source: &str,
        year: i32,
        output: &str,
    ) -> Result<u64, WorkspaceError> {
        let src = self.existing(source)?;
        let out = quote_ident(output)?;

        self.conn().execute_batch(&format!(
            "CREATE OR REPLACE TABLE {out} AS SELECT * FROM {src} WHERE year = {year};"
        ))?;

        let copied = self.count_features(output)?;
        log::debug!("Selected {copied} features for {year} from '{source}' into '{output}'");
        Ok(copied)
    }

    /// Merges `inputs` into a new subset `output`.
    ///
    /// Columns are matched by name, so subsets that gained percentage
    /// fields merge with those that did not. Feature ids are reassigned
    /// sequentially in input order.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceError::EmptyMerge`] for no inputs, or
    /// [`WorkspaceError`] if an input is missing or the merge fails.
    pub fn merge_subsets(&self, inputs: &[String], output: &str) -> Result<u64, WorkspaceError> {
        if inputs.is_empty() {
            return Err(WorkspaceError::EmptyMerge);
        }

        let out = quote_ident(output)?;
        let selects = inputs
            .iter()
            .enumerate()
            .map(|(i, name)| {
                self.existing(name)
                    .map(|q| format!("SELECT *, {i} AS _part, fid AS _fid FROM {q}"))
            })
            .collect::<Result<Vec<_>, _>>()?;

        self.conn().execute_batch(&format!(
            "CREATE OR REPLACE TABLE {out} AS
             SELECT row_number() OVER (ORDER BY _part, _fid) AS fid, * EXCLUDE (fid, _part, _fid)
             FROM ({}) merged;",
            selects.join(" UNION ALL BY NAME ")
        ))?;

        let merged = self.count_features(output)?;
        log::info!(
            "Merged {} subsets into '{output}' ({merged} features)",
            inputs.len()
        );
        Ok(merged)
    }

    /// Deletes subset `name` if it exists.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceError`] if the name is invalid or the drop fails.
    pub fn delete_subset(&self, name: &str) -> Result<(), WorkspaceError> {
        let quoted = quote_ident(name)?;
        self.conn()
            .execute_batch(&format!("DROP TABLE IF EXISTS {quoted};"))?;
        log::debug!("Deleted subset '{name}'");
        Ok(())
    }

    /// Adds the per-record percentage columns to subset `name` and fills
    /// them from `shares`. Records without a share keep `NULL`.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceError`] if the subset is missing or an update
    /// fails. A failed update leaves the subset unchanged.
    pub fn annotate_shares(
        &self,
        name: &str,
        shares: &[RecordShare],
    ) -> Result<(), WorkspaceError> {
        let quoted = self.existing(name)?;

        self.conn().execute_batch(&format!(
            "ALTER TABLE {quoted} ADD COLUMN IF NOT EXISTS {PERCENT_OF_YEAR_ACRES} DOUBLE;
             ALTER TABLE {quoted} ADD COLUMN IF NOT EXISTS {PERCENT_OF_YEAR_DAYS} DOUBLE;"
        ))?;

        self.conn().execute_batch("BEGIN TRANSACTION;")?;
        let result = self.update_shares(&quoted, shares);
        match result {
            Ok(()) => self.conn().execute_batch("COMMIT;")?,
            Err(e) => {
                if let Err(rollback) = self.conn().execute_batch("ROLLBACK;") {
                    log::warn!("Rollback of '{name}' share update failed: {rollback}");
                }
                return Err(e);
            }
        }

        log::debug!("Populated {} record shares in '{name}'", shares.len());
        Ok(())
    }

    fn update_shares(&self, quoted: &str, shares: &[RecordShare]) -> Result<(), WorkspaceError> {
        let mut stmt = self.conn().prepare(&format!(
            "UPDATE {quoted} SET {PERCENT_OF_YEAR_ACRES} = ?, {PERCENT_OF_YEAR_DAYS} = ?
             WHERE fid = ?"
        ))?;

        for share in shares {
            stmt.execute(params![
                share.percent_of_year_acres,
                share.percent_of_year_days,
                share.fid,
            ])?;
        }

        Ok(())
    }

    /// Validates `name` and checks the subset exists, returning it quoted.
    pub(crate) fn existing(&self, name: &str) -> Result<String, WorkspaceError> {
        let quoted = quote_ident(name)?;
        if self.subset_exists(name)? {
            Ok(quoted)
        } else {
            Err(WorkspaceError::MissingSubset {
                name: name.to_string(),
            })
        }
    }
}
