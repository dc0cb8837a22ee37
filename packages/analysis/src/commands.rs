//! Workspace operations shared by the CLI subcommands and the interactive
//! menu.

use std::path::Path;
use std::sync::Arc;

use fire_perimeter_aggregate::compute_totals;
use fire_perimeter_models::progress::ProgressCallback;
use fire_perimeter_models::{AggregateTotals, SummaryRow};
use fire_perimeter_workspace::FeatureWorkspace;
use fire_perimeter_workspace::import::ImportSummary;
use fire_perimeter_workspace::subsets::SubsetInfo;

use crate::AnalysisError;
use crate::collaborators::{SpatialStatistic, WorkspaceHotSpot};
use crate::config::AnalysisConfig;
use crate::pipeline::{self, PipelineReport};
use crate::report;

/// Opens the workspace named by `config`.
///
/// # Errors
///
/// Returns [`AnalysisError::Workspace`] if the file cannot be opened.
pub fn open_workspace(config: &AnalysisConfig) -> Result<FeatureWorkspace, AnalysisError> {
    let path = config.workspace_path();
    log::info!("Opening workspace {}", path.display());
    Ok(FeatureWorkspace::open(&path)?)
}

/// Loads a `GeoJSON` perimeter file as subset `name`.
///
/// # Errors
///
/// Returns [`AnalysisError::Workspace`] if the file cannot be read or
/// stored.
pub fn import(
    workspace: &FeatureWorkspace,
    config: &AnalysisConfig,
    path: &Path,
    name: &str,
) -> Result<ImportSummary, AnalysisError> {
    Ok(workspace.import_geojson(path, name, &config.fields)?)
}

/// Runs the full pipeline with the hot spot tool from `config`, if any.
///
/// # Errors
///
/// Returns [`AnalysisError`] if planning or any pipeline step fails.
pub fn run(
    workspace: &FeatureWorkspace,
    config: &AnalysisConfig,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<PipelineReport, AnalysisError> {
    let plan = config.plan()?;
    log::info!(
        "Summarizing years {:?} of '{}' into '{}'",
        plan.years,
        plan.input,
        plan.summary_table,
    );

    let hotspot = config
        .hotspot
        .tool()
        .map(|tool| WorkspaceHotSpot::new(workspace, tool, config.fields.clone()));
    let statistic = hotspot.as_ref().map(|h| h as &dyn SpatialStatistic);

    pipeline::run(workspace, statistic, &plan, progress)
}

/// Totals over a whole subset.
///
/// # Errors
///
/// Returns [`AnalysisError`] if the subset cannot be read or a record
/// violates the configured missing-field policy.
pub fn totals(
    workspace: &FeatureWorkspace,
    config: &AnalysisConfig,
    subset: &str,
) -> Result<AggregateTotals, AnalysisError> {
    let records = workspace.read_records(subset)?;
    Ok(compute_totals(&records, config.missing_fields)?)
}

/// Reads a summary table and either writes it as CSV to `csv_path` or
/// prints it.
///
/// # Errors
///
/// Returns [`AnalysisError`] if the table cannot be read or the file cannot
/// be written.
pub fn report(
    workspace: &FeatureWorkspace,
    table: &str,
    csv_path: Option<&Path>,
) -> Result<Vec<SummaryRow>, AnalysisError> {
    let rows = workspace.summary_rows(table)?;
    if let Some(path) = csv_path {
        report::write_csv(&rows, std::fs::File::create(path)?)?;
        log::info!("Wrote {} rows to {}", rows.len(), path.display());
    } else {
        print!("{}", report::format_table(&rows));
    }
    Ok(rows)
}

/// Writes a subset as `GeoJSON`.
///
/// # Errors
///
/// Returns [`AnalysisError::Workspace`] if the subset cannot be read or the
/// file cannot be written.
pub fn export(
    workspace: &FeatureWorkspace,
    subset: &str,
    path: &Path,
) -> Result<usize, AnalysisError> {
    Ok(workspace.export_geojson(subset, path)?)
}

/// Feature subsets held by the workspace.
///
/// # Errors
///
/// Returns [`AnalysisError::Workspace`] if the catalog cannot be queried.
pub fn subsets(workspace: &FeatureWorkspace) -> Result<Vec<SubsetInfo>, AnalysisError> {
    Ok(workspace.list_subsets()?)
}

#[cfg(test)]
mod tests {
    use fire_perimeter_models::progress::null_progress;
    use fire_perimeter_models::YearSelection;

    use super::*;

    const PERIMETERS: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "geometry": null, "properties": {"YEAR_": 2019, "GIS_ACRES": 100.0, "ALARM_DATE": "2019-01-01", "CONT_DATE": "2019-01-11"}},
            {"type": "Feature", "geometry": null, "properties": {"YEAR_": 2020, "GIS_ACRES": 200.0, "ALARM_DATE": "2020-01-01", "CONT_DATE": "2020-01-04"}}
        ]
    }"#;

    fn workspace() -> FeatureWorkspace {
        let ws = FeatureWorkspace::open_in_memory().unwrap();
        ws.import_geojson_str(PERIMETERS, "firep", &fire_perimeter_models::FieldMapping::default())
            .unwrap();
        ws
    }

    #[test]
    fn totals_over_subset() {
        let totals = totals(&workspace(), &AnalysisConfig::default(), "firep").unwrap();
        assert!((totals.total_acres - 300.0).abs() < f64::EPSILON);
        assert_eq!(totals.total_days, 13);
        assert_eq!(totals.records, 2);
    }

    #[test]
    fn run_without_hotspot_command_skips_statistic() {
        let ws = workspace();
        let config = AnalysisConfig {
            input: "firep".to_string(),
            years: YearSelection::Range {
                start: 2019,
                end: 2020,
            },
            ..AnalysisConfig::default()
        };

        let report = run(&ws, &config, &null_progress()).unwrap();

        assert_eq!(report.summary_table, "fire_summary_2019_2020");
        assert!(report.hotspot_output.is_none());
        let names: Vec<String> = subsets(&ws).unwrap().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["firep", "fires_2019_2020"]);
        assert_eq!(ws.summary_rows("fire_summary_2019_2020").unwrap().len(), 2);
    }

    #[test]
    fn missing_subset_totals_fail() {
        assert!(totals(&workspace(), &AnalysisConfig::default(), "nope").is_err());
    }
}
