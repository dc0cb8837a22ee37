//! Storage and statistic collaborators the pipeline depends on.
//!
//! Each trait is the contract of one external geoprocessing step. The
//! `DuckDB` [`FeatureWorkspace`] implements the storage traits directly;
//! [`WorkspaceHotSpot`] adapts the external hot-spot tool to
//! [`SpatialStatistic`] by exchanging `GeoJSON` files with it.

use fire_perimeter_hotspot::{ExternalHotSpotTool, HotSpotInvocation};
use fire_perimeter_models::{FieldMapping, FireRecord, HotSpotRequest, RecordShare, SummaryRow};
use fire_perimeter_workspace::FeatureWorkspace;

use crate::AnalysisError;

/// Reads fire records and selects per-year subsets.
pub trait RecordSource {
    /// Reads every record of `subset`.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError`] if the subset cannot be read.
    fn read_records(&self, subset: &str) -> Result<Vec<FireRecord>, AnalysisError>;

    /// Copies the records of `source` for `year` into a new subset `output`.
    /// Returns the number of records copied.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError`] if the selection or copy fails.
    fn select_year(&self, source: &str, year: i32, output: &str) -> Result<u64, AnalysisError>;

    /// Returns `true` if `subset` exists.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError`] if the store cannot be queried.
    fn subset_exists(&self, subset: &str) -> Result<bool, AnalysisError>;
}

/// Append-only summary table sink.
pub trait SummarySink {
    /// Creates (or replaces) the summary table.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError`] if the table cannot be created.
    fn create_summary_table(&self, table: &str) -> Result<(), AnalysisError>;

    /// Appends one row.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError`] if the row cannot be written.
    fn append_summary_row(&self, table: &str, row: &SummaryRow) -> Result<(), AnalysisError>;
}

/// Merges and deletes named feature subsets.
pub trait FeatureMerger {
    /// Merges `inputs`, in order, into a new subset `output`. Returns the
    /// number of merged records.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError`] if an input is missing or the merge fails.
    fn merge_subsets(&self, inputs: &[String], output: &str) -> Result<u64, AnalysisError>;

    /// Deletes `subset`.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError`] if the delete fails.
    fn delete_subset(&self, subset: &str) -> Result<(), AnalysisError>;
}

/// Writes per-record shares back onto a subset.
pub trait RecordAnnotator {
    /// Adds the share fields to `subset` and populates them.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError`] if the fields cannot be added or written.
    fn annotate_shares(&self, subset: &str, shares: &[RecordShare]) -> Result<(), AnalysisError>;
}

/// Everything the pipeline needs from its feature store.
pub trait FeatureStore: RecordSource + SummarySink + FeatureMerger + RecordAnnotator {}

impl<T: RecordSource + SummarySink + FeatureMerger + RecordAnnotator> FeatureStore for T {}

/// Spatial clustering statistic over a named subset.
pub trait SpatialStatistic {
    /// Runs the statistic, producing `request.output`.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError`] if the statistic fails.
    fn hot_spots(&self, request: &HotSpotRequest) -> Result<(), AnalysisError>;
}

impl RecordSource for FeatureWorkspace {
    fn read_records(&self, subset: &str) -> Result<Vec<FireRecord>, AnalysisError> {
        Ok(Self::read_records(self, subset)?)
    }

    fn select_year(&self, source: &str, year: i32, output: &str) -> Result<u64, AnalysisError> {
        Ok(Self::select_year(self, source, year, output)?)
    }

    fn subset_exists(&self, subset: &str) -> Result<bool, AnalysisError> {
        Ok(Self::subset_exists(self, subset)?)
    }
}

impl SummarySink for FeatureWorkspace {
    fn create_summary_table(&self, table: &str) -> Result<(), AnalysisError> {
        Ok(Self::create_summary_table(self, table)?)
    }

    fn append_summary_row(&self, table: &str, row: &SummaryRow) -> Result<(), AnalysisError> {
        Ok(Self::append_summary_row(self, table, row)?)
    }
}

impl FeatureMerger for FeatureWorkspace {
    fn merge_subsets(&self, inputs: &[String], output: &str) -> Result<u64, AnalysisError> {
        Ok(Self::merge_subsets(self, inputs, output)?)
    }

    fn delete_subset(&self, subset: &str) -> Result<(), AnalysisError> {
        Ok(Self::delete_subset(self, subset)?)
    }
}

impl RecordAnnotator for FeatureWorkspace {
    fn annotate_shares(&self, subset: &str, shares: &[RecordShare]) -> Result<(), AnalysisError> {
        Ok(Self::annotate_shares(self, subset, shares)?)
    }
}

/// Runs an [`ExternalHotSpotTool`] against subsets of a [`FeatureWorkspace`].
///
/// The input subset is exported to the workspace exchange directory, the
/// tool writes its annotated output next to it, and that output is imported
/// back as `request.output`. Exchange files are removed afterwards.
pub struct WorkspaceHotSpot<'a> {
    workspace: &'a FeatureWorkspace,
    tool: ExternalHotSpotTool,
    fields: FieldMapping,
}

impl<'a> WorkspaceHotSpot<'a> {
    /// Creates the adapter. `fields` is used to re-import the tool output.
    #[must_use]
    pub const fn new(
        workspace: &'a FeatureWorkspace,
        tool: ExternalHotSpotTool,
        fields: FieldMapping,
    ) -> Self {
        Self {
            workspace,
            tool,
            fields,
        }
    }
}

impl SpatialStatistic for WorkspaceHotSpot<'_> {
    fn hot_spots(&self, request: &HotSpotRequest) -> Result<(), AnalysisError> {
        let exchange = self.workspace.exchange_dir();
        let input_path = exchange.join(format!("{}.geojson", request.input));
        let output_path = exchange.join(format!("{}.geojson", request.output));

        self.workspace.export_geojson(&request.input, &input_path)?;

        let result = self
            .tool
            .run(&HotSpotInvocation {
                input: &input_path,
                field: &request.field,
                output: &output_path,
                conceptualization: request.conceptualization,
                distance_method: request.distance_method,
            })
            .map_err(AnalysisError::from)
            .and_then(|()| {
                self.workspace
                    .import_geojson(&output_path, &request.output, &self.fields)
                    .map_err(AnalysisError::from)
            });

        for path in [&input_path, &output_path] {
            if path.exists()
                && let Err(e) = std::fs::remove_file(path)
            {
                log::debug!("Could not remove exchange file {}: {e}", path.display());
            }
        }

        result.map(|summary| {
            log::info!(
                "Hot spot output '{}' holds {} features",
                request.output,
                summary.features
            );
        })
    }
}
