//! Run configuration.
//!
//! Loaded from an optional TOML file where every key has a default, then
//! overridden by CLI flags. [`AnalysisConfig::plan`] resolves the years and
//! derives the names of everything a run creates.

use std::path::{Path, PathBuf};

use fire_perimeter_hotspot::ExternalHotSpotTool;
use fire_perimeter_models::{
    Conceptualization, DistanceMethod, FieldMapping, HotSpotRequest, MissingFieldPolicy,
    YearSelection,
};
use fire_perimeter_workspace::{paths, quote_ident};
use serde::{Deserialize, Serialize};

use crate::AnalysisError;

/// Default name of the dataset subset the analysis reads.
pub const DEFAULT_INPUT: &str = "firep24_1";

/// Default summary table name for list runs.
pub const DEFAULT_SUMMARY_TABLE: &str = "fire_summary";

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Workspace file. Falls back to [`paths::default_workspace_path`].
    pub workspace: Option<PathBuf>,
    /// Subset holding the full dataset.
    pub input: String,
    /// Summary table name. Derived from the years when absent.
    pub summary_table: Option<String>,
    /// Treatment of records with absent acreage or dates.
    pub missing_fields: MissingFieldPolicy,
    /// Write per-record shares onto each year subset.
    pub annotate_records: bool,
    /// Years of interest.
    pub years: YearSelection,
    /// Source property names.
    pub fields: FieldMapping,
    /// Hot spot statistic settings.
    pub hotspot: HotSpotConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            workspace: None,
            input: DEFAULT_INPUT.to_string(),
            summary_table: None,
            missing_fields: MissingFieldPolicy::default(),
            annotate_records: false,
            years: YearSelection::default(),
            fields: FieldMapping::default(),
            hotspot: HotSpotConfig::default(),
        }
    }
}

/// `[hotspot]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HotSpotConfig {
    /// External program. The hot spot step is skipped when unset.
    pub command: Option<String>,
    /// Leading arguments passed before the generated ones.
    pub args: Vec<String>,
    pub conceptualization: Conceptualization,
    pub distance_method: DistanceMethod,
}

impl HotSpotConfig {
    /// The configured tool, if any.
    #[must_use]
    pub fn tool(&self) -> Option<ExternalHotSpotTool> {
        self.command
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .map(|program| ExternalHotSpotTool {
                program: program.to_string(),
                args: self.args.clone(),
            })
    }
}

/// CLI flags that take precedence over the file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOverrides {
    pub workspace: Option<PathBuf>,
    pub input: Option<String>,
    pub summary_table: Option<String>,
    pub years: Option<YearSelection>,
    pub missing_fields: Option<MissingFieldPolicy>,
    /// Only ever turns annotation on.
    pub annotate: bool,
    pub hotspot_command: Option<String>,
}

impl AnalysisConfig {
    /// Parses a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::ConfigParse`] if the document is invalid.
    pub fn parse(text: &str) -> Result<Self, AnalysisError> {
        Ok(toml::de::from_str(text)?)
    }

    /// Reads and parses a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, AnalysisError> {
        log::debug!("Loading config from {}", path.display());
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Loads `path` when given, otherwise returns the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError`] if the file cannot be read or parsed.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, AnalysisError> {
        path.map_or_else(|| Ok(Self::default()), Self::load)
    }

    /// Applies CLI overrides in place.
    pub fn apply(&mut self, overrides: RunOverrides) {
        if let Some(workspace) = overrides.workspace {
            self.workspace = Some(workspace);
        }
        if let Some(input) = overrides.input {
            self.input = input;
        }
        if let Some(table) = overrides.summary_table {
            self.summary_table = Some(table);
        }
        if let Some(years) = overrides.years {
            self.years = years;
        }
        if let Some(policy) = overrides.missing_fields {
            self.missing_fields = policy;
        }
        if overrides.annotate {
            self.annotate_records = true;
        }
        if let Some(command) = overrides.hotspot_command {
            self.hotspot.command = Some(command);
        }
    }

    /// Workspace file to open.
    #[must_use]
    pub fn workspace_path(&self) -> PathBuf {
        self.workspace
            .clone()
            .unwrap_or_else(paths::default_workspace_path)
    }

    /// Summary table name: the configured one, `fire_summary_{start}_{end}`
    /// for range runs, `fire_summary` otherwise.
    #[must_use]
    pub fn summary_table_name(&self) -> String {
        if let Some(table) = &self.summary_table {
            return table.clone();
        }
        match &self.years {
            YearSelection::Range { start, end } => {
                format!("{DEFAULT_SUMMARY_TABLE}_{start}_{end}")
            }
            YearSelection::List { .. } => DEFAULT_SUMMARY_TABLE.to_string(),
        }
    }

    /// Resolves the years and derived names into a [`RunPlan`].
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::Config`] if the year selection is empty or
    /// inverted, or a derived name collides with the input subset, and
    /// [`AnalysisError::Workspace`] if any name is not a valid identifier.
    pub fn plan(&self) -> Result<RunPlan, AnalysisError> {
        let years = self.years.years().map_err(|e| AnalysisError::Config {
            message: e.to_string(),
        })?;
        let (first, last) = match (years.first(), years.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => {
                return Err(AnalysisError::Config {
                    message: "no years of interest given".to_string(),
                });
            }
        };

        let plan = RunPlan {
            input: self.input.clone(),
            summary_table: self.summary_table_name(),
            merged_subset: format!("fires_{first}_{last}"),
            hotspot_output: format!("hotspots_{first}_{last}"),
            acres_field: self.fields.acres.clone(),
            policy: self.missing_fields,
            annotate: self.annotate_records,
            conceptualization: self.hotspot.conceptualization,
            distance_method: self.hotspot.distance_method,
            years,
        };

        quote_ident(&plan.input)?;
        for name in plan.created_names() {
            quote_ident(&name)?;
            // DuckDB resolves identifiers case-insensitively, even quoted.
            if name.eq_ignore_ascii_case(&plan.input) {
                return Err(AnalysisError::Config {
                    message: format!("input subset '{name}' would be overwritten by the run"),
                });
            }
        }

        Ok(plan)
    }
}

/// Everything one pipeline run needs, with all names resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct RunPlan {
    pub input: String,
    /// Distinct years in processing order.
    pub years: Vec<i32>,
    pub summary_table: String,
    pub merged_subset: String,
    pub hotspot_output: String,
    /// Field the hot spot statistic analyses.
    pub acres_field: String,
    pub policy: MissingFieldPolicy,
    pub annotate: bool,
    pub conceptualization: Conceptualization,
    pub distance_method: DistanceMethod,
}

impl RunPlan {
    /// Name of the intermediate subset for `year`.
    #[must_use]
    pub fn year_subset(year: i32) -> String {
        format!("fires_{year}")
    }

    /// Hot spot request over the merged subset.
    #[must_use]
    pub fn hotspot_request(&self) -> HotSpotRequest {
        HotSpotRequest {
            input: self.merged_subset.clone(),
            field: self.acres_field.clone(),
            output: self.hotspot_output.clone(),
            conceptualization: self.conceptualization,
            distance_method: self.distance_method,
        }
    }

    fn created_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.years.iter().map(|y| Self::year_subset(*y)).collect();
        names.push(self.summary_table.clone());
        names.push(self.merged_subset.clone());
        names.push(self.hotspot_output.clone());
        names
    }
}

#[cfg(test)]
mod tests {
    use fire_perimeter_workspace::WorkspaceError;

    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = AnalysisConfig::parse("").unwrap();
        assert_eq!(config, AnalysisConfig::default());

        let plan = config.plan().unwrap();
        assert_eq!(plan.input, "firep24_1");
        assert_eq!(plan.years, vec![2019, 2020]);
        assert_eq!(plan.summary_table, "fire_summary");
        assert_eq!(plan.merged_subset, "fires_2019_2020");
        assert_eq!(plan.hotspot_output, "hotspots_2019_2020");
        assert_eq!(plan.acres_field, "GIS_ACRES");
        assert_eq!(plan.policy, MissingFieldPolicy::Skip);
        assert!(!plan.annotate);
    }

    #[test]
    fn parses_full_document() {
        let config = AnalysisConfig::parse(
            r#"
            workspace = "/tmp/fires.duckdb"
            input = "perimeters"
            missing_fields = "fail"
            annotate_records = true

            [years]
            start = 2017
            end = 2020

            [fields]
            acres = "ACRES"

            [hotspot]
            command = "fire-hotspots"
            args = ["--seed", "7"]
            conceptualization = "FIXED_DISTANCE_BAND"
            distance_method = "MANHATTAN_DISTANCE"
            "#,
        )
        .unwrap();

        assert_eq!(config.workspace_path(), PathBuf::from("/tmp/fires.duckdb"));
        assert_eq!(config.fields.acres, "ACRES");
        assert_eq!(config.fields.year, "YEAR_");
        assert_eq!(
            config.hotspot.tool(),
            Some(ExternalHotSpotTool {
                program: "fire-hotspots".to_string(),
                args: vec!["--seed".to_string(), "7".to_string()],
            })
        );

        let plan = config.plan().unwrap();
        assert_eq!(plan.years, vec![2017, 2018, 2019, 2020]);
        assert_eq!(plan.summary_table, "fire_summary_2017_2020");
        assert_eq!(plan.merged_subset, "fires_2017_2020");
        assert_eq!(plan.policy, MissingFieldPolicy::Fail);
        assert!(plan.annotate);
        assert_eq!(
            plan.hotspot_request(),
            HotSpotRequest {
                input: "fires_2017_2020".to_string(),
                field: "ACRES".to_string(),
                output: "hotspots_2017_2020".to_string(),
                conceptualization: Conceptualization::FixedDistanceBand,
                distance_method: DistanceMethod::ManhattanDistance,
            }
        );
    }

    #[test]
    fn list_names_follow_processing_order() {
        let config = AnalysisConfig::parse("[years]\nlist = [2020, 2018, 2020]").unwrap();
        let plan = config.plan().unwrap();
        assert_eq!(plan.years, vec![2020, 2018]);
        assert_eq!(plan.merged_subset, "fires_2020_2018");
        assert_eq!(plan.summary_table, "fire_summary");
    }

    #[test]
    fn inverted_range_is_config_error() {
        let config = AnalysisConfig::parse("[years]\nstart = 2021\nend = 2019").unwrap();
        assert!(matches!(config.plan(), Err(AnalysisError::Config { .. })));
    }

    #[test]
    fn empty_list_is_config_error() {
        let config = AnalysisConfig::parse("[years]\nlist = []").unwrap();
        assert!(matches!(config.plan(), Err(AnalysisError::Config { .. })));
    }

    #[test]
    fn input_colliding_with_year_subset_is_rejected() {
        let config = AnalysisConfig {
            input: "fires_2019".to_string(),
            ..AnalysisConfig::default()
        };
        assert!(matches!(config.plan(), Err(AnalysisError::Config { .. })));
    }

    #[test]
    fn input_colliding_in_other_case_is_rejected() {
        let config = AnalysisConfig {
            input: "Fires_2019".to_string(),
            ..AnalysisConfig::default()
        };
        assert!(matches!(config.plan(), Err(AnalysisError::Config { .. })));

        let config = AnalysisConfig {
            input: "FIRE_SUMMARY".to_string(),
            ..AnalysisConfig::default()
        };
        assert!(matches!(config.plan(), Err(AnalysisError::Config { .. })));
    }

    #[test]
    fn invalid_identifiers_are_rejected() {
        let config = AnalysisConfig {
            summary_table: Some("fire summary".to_string()),
            ..AnalysisConfig::default()
        };
        assert!(matches!(
            config.plan(),
            Err(AnalysisError::Workspace(WorkspaceError::InvalidName { .. }))
        ));
    }

    #[test]
    fn unknown_policy_fails_to_parse() {
        assert!(matches!(
            AnalysisConfig::parse("missing_fields = \"ignore\""),
            Err(AnalysisError::ConfigParse(_))
        ));
    }

    #[test]
    fn overrides_take_precedence() {
        let mut config =
            AnalysisConfig::parse("annotate_records = false\n[hotspot]\ncommand = \"a\"")
                .unwrap();
        config.apply(RunOverrides {
            years: Some(YearSelection::Range {
                start: 2010,
                end: 2011,
            }),
            annotate: true,
            hotspot_command: Some("b".to_string()),
            missing_fields: Some(MissingFieldPolicy::Fail),
            ..RunOverrides::default()
        });

        assert!(config.annotate_records);
        assert_eq!(config.missing_fields, MissingFieldPolicy::Fail);
        assert_eq!(config.hotspot.tool().map(|t| t.program), Some("b".to_string()));
        assert_eq!(config.summary_table_name(), "fire_summary_2010_2011");
    }

    #[test]
    fn blank_command_disables_hotspot() {
        let config = AnalysisConfig::parse("[hotspot]\ncommand = \"  \"").unwrap();
        assert!(config.hotspot.tool().is_none());
    }
}
