//! The yearly summary pipeline.

use std::sync::Arc;

use fire_perimeter_aggregate::{build_summary_row, compute_totals, record_shares};
use fire_perimeter_models::progress::ProgressCallback;
use fire_perimeter_models::{AggregateTotals, SummaryRow};
use fire_perimeter_workspace::WorkspaceError;

use crate::AnalysisError;
use crate::cleanup::IntermediateSubsets;
use crate::collaborators::{FeatureStore, SpatialStatistic};
use crate::config::RunPlan;

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineReport {
    /// Totals over the whole input subset.
    pub grand_totals: AggregateTotals,
    /// Rows appended to the summary table, in order.
    pub rows: Vec<SummaryRow>,
    pub summary_table: String,
    pub merged_subset: String,
    pub merged_records: u64,
    /// Hot spot output subset, `None` when the step was skipped.
    pub hotspot_output: Option<String>,
}

/// Runs the full pipeline described by `plan`.
///
/// 1. Grand totals over `plan.input`.
/// 2. Per year: select into `fires_{year}`, total it, append a summary row,
///    and optionally annotate per-record shares.
/// 3. Merge the year subsets, then delete them.
/// 4. Hot spot statistic over the merged subset, when one is given.
///
/// If any step fails, the year subsets created so far are deleted before
/// the error is returned.
///
/// # Errors
///
/// Returns [`AnalysisError`] if the input subset is missing, a record
/// violates the missing-field policy, or any collaborator fails.
pub fn run<S: FeatureStore + ?Sized>(
    store: &S,
    statistic: Option<&dyn SpatialStatistic>,
    plan: &RunPlan,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<PipelineReport, AnalysisError> {
    if !store.subset_exists(&plan.input)? {
        return Err(WorkspaceError::MissingSubset {
            name: plan.input.clone(),
        }
        .into());
    }

    let grand_totals = compute_totals(&store.read_records(&plan.input)?, plan.policy)?;
    log::info!(
        "Dataset '{}': {} records, {:.2} acres, {} burn days",
        plan.input,
        grand_totals.records,
        grand_totals.total_acres,
        grand_totals.total_days,
    );

    store.create_summary_table(&plan.summary_table)?;

    let mut intermediates = IntermediateSubsets::new(store);
    let mut rows = Vec::with_capacity(plan.years.len());

    progress.set_total(plan.years.len() as u64);
    for &year in &plan.years {
        progress.set_message(format!("Year {year}"));
        let subset = RunPlan::year_subset(year);

        intermediates.track(subset.clone());
        let selected = store.select_year(&plan.input, year, &subset)?;
        log::info!("Selected {selected} records for {year} into '{subset}'");

        let records = store.read_records(&subset)?;
        let year_totals = compute_totals(&records, plan.policy)?;

        if plan.annotate {
            store.annotate_shares(&subset, &record_shares(&records, &year_totals))?;
        }

        let row = build_summary_row(year, &year_totals, &grand_totals);
        store.append_summary_row(&plan.summary_table, &row)?;
        log::info!(
            "{year}: {:.2} acres ({:.2}%), {} burn days ({:.2}%)",
            row.acres_burnt,
            row.percent_of_total_acres,
            row.burn_days,
            row.percent_of_total_days,
        );

        rows.push(row);
        progress.inc(1);
    }

    let merged_records = store.merge_subsets(intermediates.names(), &plan.merged_subset)?;
    log::info!(
        "Merged {} year subsets into '{}' ({merged_records} records)",
        intermediates.names().len(),
        plan.merged_subset,
    );
    intermediates.delete_all()?;

    let hotspot_output = if let Some(statistic) = statistic {
        progress.set_message("Hot spot analysis".to_string());
        statistic.hot_spots(&plan.hotspot_request())?;
        Some(plan.hotspot_output.clone())
    } else {
        log::warn!("No hot spot command configured, skipping hot spot analysis");
        None
    };

    progress.finish(format!("{} years summarized", rows.len()));

    Ok(PipelineReport {
        grand_totals,
        rows,
        summary_table: plan.summary_table.clone(),
        merged_subset: plan.merged_subset.clone(),
        merged_records,
        hotspot_output,
    })
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::BTreeMap;

    use chrono::{NaiveDate, NaiveDateTime};
    use fire_perimeter_models::progress::null_progress;
    use fire_perimeter_models::{
        FieldMapping, FireRecord, HotSpotRequest, MissingFieldPolicy, RecordShare, YearSelection,
    };
    use fire_perimeter_workspace::FeatureWorkspace;

    use super::*;
    use crate::collaborators::{FeatureMerger, RecordAnnotator, RecordSource, SummarySink};
    use crate::config::AnalysisConfig;

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn fire(fid: i64, year: i32, acres: f64, days: u32) -> FireRecord {
        FireRecord {
            fid,
            year: Some(year),
            acres: Some(acres),
            alarm: Some(at(year, 1, 1)),
            containment: Some(at(year, 1, 1 + days)),
        }
    }

    /// In-memory store with one-shot failure injection.
    #[derive(Default)]
    struct MemoryStore {
        subsets: RefCell<BTreeMap<String, Vec<FireRecord>>>,
        tables: RefCell<BTreeMap<String, Vec<SummaryRow>>>,
        shares: RefCell<BTreeMap<String, Vec<RecordShare>>>,
        deleted: RefCell<Vec<String>>,
        fail_on: Option<&'static str>,
    }

    impl MemoryStore {
        fn with_input(records: Vec<FireRecord>) -> Self {
            let store = Self::default();
            store
                .subsets
                .borrow_mut()
                .insert("firep".to_string(), records);
            store
        }

        fn check(&self, op: &str) -> Result<(), AnalysisError> {
            if self.fail_on.is_some_and(|f| f == op) {
                return Err(AnalysisError::Collaborator {
                    message: format!("{op} failed"),
                });
            }
            Ok(())
        }

        fn names(&self) -> Vec<String> {
            self.subsets.borrow().keys().cloned().collect()
        }
    }

    impl RecordSource for MemoryStore {
        fn read_records(&self, subset: &str) -> Result<Vec<FireRecord>, AnalysisError> {
            self.subsets.borrow().get(subset).cloned().ok_or_else(|| {
                WorkspaceError::MissingSubset {
                    name: subset.to_string(),
                }
                .into()
            })
        }

        fn select_year(&self, source: &str, year: i32, output: &str) -> Result<u64, AnalysisError> {
            let selected: Vec<FireRecord> = self
                .read_records(source)?
                .into_iter()
                .filter(|r| r.year == Some(year))
                .collect();
            let count = selected.len() as u64;
            self.subsets
                .borrow_mut()
                .insert(output.to_string(), selected);
            self.check(&format!("select_year:{year}"))?;
            Ok(count)
        }

        fn subset_exists(&self, subset: &str) -> Result<bool, AnalysisError> {
            Ok(self.subsets.borrow().contains_key(subset))
        }
    }

    impl SummarySink for MemoryStore {
        fn create_summary_table(&self, table: &str) -> Result<(), AnalysisError> {
            self.tables.borrow_mut().insert(table.to_string(), Vec::new());
            Ok(())
        }

        fn append_summary_row(&self, table: &str, row: &SummaryRow) -> Result<(), AnalysisError> {
            self.check(&format!("append:{}", row.year))?;
            self.tables
                .borrow_mut()
                .entry(table.to_string())
                .or_default()
                .push(*row);
            Ok(())
        }
    }

    impl FeatureMerger for MemoryStore {
        fn merge_subsets(&self, inputs: &[String], output: &str) -> Result<u64, AnalysisError> {
            self.check("merge")?;
            let mut merged = Vec::new();
            for input in inputs {
                merged.extend(self.read_records(input)?);
            }
            let count = merged.len() as u64;
            self.subsets.borrow_mut().insert(output.to_string(), merged);
            Ok(count)
        }

        fn delete_subset(&self, subset: &str) -> Result<(), AnalysisError> {
            self.subsets.borrow_mut().remove(subset);
            self.deleted.borrow_mut().push(subset.to_string());
            Ok(())
        }
    }

    impl RecordAnnotator for MemoryStore {
        fn annotate_shares(
            &self,
            subset: &str,
            shares: &[RecordShare],
        ) -> Result<(), AnalysisError> {
            self.shares
                .borrow_mut()
                .insert(subset.to_string(), shares.to_vec());
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingStatistic {
        requests: RefCell<Vec<HotSpotRequest>>,
    }

    impl SpatialStatistic for RecordingStatistic {
        fn hot_spots(&self, request: &HotSpotRequest) -> Result<(), AnalysisError> {
            self.requests.borrow_mut().push(request.clone());
            Ok(())
        }
    }

    fn plan(years: YearSelection) -> RunPlan {
        AnalysisConfig {
            input: "firep".to_string(),
            years,
            ..AnalysisConfig::default()
        }
        .plan()
        .unwrap()
    }

    fn dataset() -> Vec<FireRecord> {
        vec![
            fire(1, 2019, 100.0, 10),
            fire(2, 2019, 50.0, 1),
            fire(3, 2020, 120.0, 5),
            fire(4, 2018, 30.0, 4),
        ]
    }

    #[test]
    fn appends_one_row_per_year_and_cleans_up() {
        let store = MemoryStore::with_input(dataset());
        let statistic = RecordingStatistic::default();
        let plan = plan(YearSelection::List {
            list: vec![2019, 2020],
        });

        let report = run(&store, Some(&statistic), &plan, &null_progress()).unwrap();

        assert!((report.grand_totals.total_acres - 300.0).abs() < f64::EPSILON);
        assert_eq!(report.grand_totals.total_days, 20);
        assert_eq!(report.rows.len(), 2);

        let row = report.rows[0];
        assert_eq!(row.year, 2019);
        assert!((row.acres_burnt - 150.0).abs() < f64::EPSILON);
        assert!((row.burn_days - 11.0).abs() < 1e-9);
        assert!((row.percent_of_total_acres - 50.0).abs() < f64::EPSILON);
        assert!((row.percent_of_total_days - 55.0).abs() < 1e-9);

        assert_eq!(store.tables.borrow()["fire_summary"], report.rows);
        assert_eq!(report.merged_records, 3);
        assert_eq!(store.names(), vec!["firep", "fires_2019_2020"]);
        assert_eq!(
            *store.deleted.borrow(),
            vec!["fires_2019".to_string(), "fires_2020".to_string()]
        );

        assert_eq!(report.hotspot_output.as_deref(), Some("hotspots_2019_2020"));
        let requests = statistic.requests.borrow();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].input, "fires_2019_2020");
        assert_eq!(requests[0].field, "GIS_ACRES");
    }

    #[test]
    fn year_rows_are_independent_of_each_other() {
        let both = MemoryStore::with_input(dataset());
        let both_report = run(
            &both,
            None,
            &plan(YearSelection::List {
                list: vec![2019, 2020],
            }),
            &null_progress(),
        )
        .unwrap();

        let alone = MemoryStore::with_input(dataset());
        let alone_report = run(
            &alone,
            None,
            &plan(YearSelection::List { list: vec![2020] }),
            &null_progress(),
        )
        .unwrap();

        assert_eq!(both_report.rows[1], alone_report.rows[0]);
        assert!(alone_report.hotspot_output.is_none());
    }

    #[test]
    fn duplicate_years_are_processed_once() {
        let store = MemoryStore::with_input(dataset());
        let report = run(
            &store,
            None,
            &plan(YearSelection::List {
                list: vec![2019, 2019, 2020],
            }),
            &null_progress(),
        )
        .unwrap();

        let years: Vec<i32> = report.rows.iter().map(|r| r.year).collect();
        assert_eq!(years, vec![2019, 2020]);
    }

    #[test]
    fn empty_year_gets_zero_row() {
        let store = MemoryStore::with_input(dataset());
        let report = run(
            &store,
            None,
            &plan(YearSelection::Range {
                start: 2021,
                end: 2021,
            }),
            &null_progress(),
        )
        .unwrap();

        let row = report.rows[0];
        assert_eq!(row.year, 2021);
        assert!(row.acres_burnt.abs() < f64::EPSILON);
        assert!(row.burn_days.abs() < f64::EPSILON);
        assert!(row.percent_of_total_acres.abs() < f64::EPSILON);
        assert_eq!(report.summary_table, "fire_summary_2021_2021");
    }

    #[test]
    fn empty_dataset_yields_zero_percentages() {
        let store = MemoryStore::with_input(Vec::new());
        let report = run(
            &store,
            None,
            &plan(YearSelection::default()),
            &null_progress(),
        )
        .unwrap();

        assert!(report.rows.iter().all(|r| {
            r.percent_of_total_acres.abs() < f64::EPSILON
                && r.percent_of_total_days.abs() < f64::EPSILON
        }));
    }

    #[test]
    fn annotates_year_subsets_when_requested() {
        let store = MemoryStore::with_input(dataset());
        let mut plan = plan(YearSelection::List { list: vec![2019] });
        plan.annotate = true;

        run(&store, None, &plan, &null_progress()).unwrap();

        let shares = store.shares.borrow();
        let year = &shares["fires_2019"];
        let acres: f64 = year.iter().map(|s| s.percent_of_year_acres).sum();
        let days: f64 = year.iter().map(|s| s.percent_of_year_days).sum();
        assert!((acres - 100.0).abs() < 1e-9);
        assert!((days - 100.0).abs() < 1e-9);
    }

    #[test]
    fn failing_append_removes_only_created_subsets() {
        let mut store = MemoryStore::with_input(dataset());
        store
            .subsets
            .borrow_mut()
            .insert("fires_2018".to_string(), Vec::new());
        store.fail_on = Some("append:2020");

        let result = run(
            &store,
            None,
            &plan(YearSelection::List {
                list: vec![2019, 2020],
            }),
            &null_progress(),
        );

        assert!(matches!(result, Err(AnalysisError::Collaborator { .. })));
        assert_eq!(store.names(), vec!["firep", "fires_2018"]);
        assert_eq!(
            *store.deleted.borrow(),
            vec!["fires_2019".to_string(), "fires_2020".to_string()]
        );
        assert_eq!(store.tables.borrow()["fire_summary"].len(), 1);
    }

    #[test]
    fn failing_selection_removes_partial_subset() {
        let mut store = MemoryStore::with_input(dataset());
        store.fail_on = Some("select_year:2020");

        let result = run(
            &store,
            None,
            &plan(YearSelection::default()),
            &null_progress(),
        );

        assert!(result.is_err());
        assert_eq!(store.names(), vec!["firep"]);
    }

    #[test]
    fn failing_merge_removes_year_subsets() {
        let mut store = MemoryStore::with_input(dataset());
        store.fail_on = Some("merge");

        let result = run(
            &store,
            None,
            &plan(YearSelection::default()),
            &null_progress(),
        );

        assert!(result.is_err());
        assert_eq!(store.names(), vec!["firep"]);
    }

    #[test]
    fn strict_policy_aborts_on_missing_acres() {
        let mut records = dataset();
        records[2].acres = None;
        let store = MemoryStore::with_input(records);
        let mut plan = plan(YearSelection::default());
        plan.policy = MissingFieldPolicy::Fail;

        let result = run(&store, None, &plan, &null_progress());

        assert!(matches!(result, Err(AnalysisError::Aggregate(_))));
        assert!(store.deleted.borrow().is_empty());
    }

    #[test]
    fn missing_input_is_reported() {
        let store = MemoryStore::default();
        let result = run(
            &store,
            None,
            &plan(YearSelection::default()),
            &null_progress(),
        );
        assert!(matches!(
            result,
            Err(AnalysisError::Workspace(WorkspaceError::MissingSubset { .. }))
        ));
    }

    #[test]
    fn runs_against_duckdb_workspace() {
        let ws = FeatureWorkspace::open_in_memory().unwrap();
        ws.import_geojson_str(
            r#"{
                "type": "FeatureCollection",
                "features": [
                    {"type": "Feature", "geometry": null, "properties": {"YEAR_": 2019, "GIS_ACRES": 100.0, "ALARM_DATE": "2019-01-01", "CONT_DATE": "2019-01-11"}},
                    {"type": "Feature", "geometry": null, "properties": {"YEAR_": 2019, "GIS_ACRES": 50.0, "ALARM_DATE": "2019-02-01", "CONT_DATE": "2019-02-02"}},
                    {"type": "Feature", "geometry": null, "properties": {"YEAR_": 2020, "GIS_ACRES": 120.0, "ALARM_DATE": "2020-07-01", "CONT_DATE": "2020-07-06"}},
                    {"type": "Feature", "geometry": null, "properties": {"YEAR_": 2018, "GIS_ACRES": 30.0, "ALARM_DATE": "2018-07-01", "CONT_DATE": "2018-07-05"}}
                ]
            }"#,
            "firep",
            &FieldMapping::default(),
        )
        .unwrap();

        let mut plan = plan(YearSelection::default());
        plan.annotate = true;
        let report = run(&ws, None, &plan, &null_progress()).unwrap();

        assert_eq!(ws.summary_rows("fire_summary").unwrap(), report.rows);
        assert!((report.rows[0].percent_of_total_days - 55.0).abs() < 1e-9);
        assert!(ws.subset_exists("fires_2019_2020").unwrap());
        assert!(!ws.subset_exists("fires_2019").unwrap());
        assert!(!ws.subset_exists("fires_2020").unwrap());
        assert_eq!(ws.count_features("fires_2019_2020").unwrap(), 3);
    }
}
