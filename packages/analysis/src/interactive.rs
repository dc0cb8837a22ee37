#![allow(clippy::module_name_repetitions)]

//! Interactive menu for the fire perimeter analysis.
//!
//! Presents a menu-driven interface using `dialoguer` so the pipeline can be
//! run without memorizing CLI flags.

use std::path::PathBuf;

use dialoguer::{Confirm, Input, Select};
use fire_perimeter_cli_utils::{IndicatifProgress, MultiProgress};
use fire_perimeter_models::{MissingFieldPolicy, YearSelection};
use fire_perimeter_workspace::FeatureWorkspace;

use crate::commands;
use crate::config::AnalysisConfig;
use crate::report;

/// Top-level actions available in the interactive menu.
enum Action {
    Run,
    Import,
    Totals,
    Report,
    Export,
    ListSubsets,
}

impl Action {
    const ALL: &[Self] = &[
        Self::Run,
        Self::Import,
        Self::Totals,
        Self::Report,
        Self::Export,
        Self::ListSubsets,
    ];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::Run => "Run yearly summary pipeline",
            Self::Import => "Import perimeter GeoJSON",
            Self::Totals => "Show dataset totals",
            Self::Report => "Show or export a summary table",
            Self::Export => "Export a subset as GeoJSON",
            Self::ListSubsets => "List subsets",
        }
    }
}

/// Runs the interactive menu against the workspace named by `config`.
///
/// # Errors
///
/// Returns an error if a prompt fails or the selected operation fails.
pub fn run(
    config: &mut AnalysisConfig,
    multi: &MultiProgress,
) -> Result<(), Box<dyn std::error::Error>> {
    let workspace = commands::open_workspace(config)?;

    let labels: Vec<&str> = Action::ALL.iter().map(Action::label).collect();

    let idx = Select::new()
        .with_prompt("What would you like to do?")
        .items(&labels)
        .default(0)
        .interact()?;

    match Action::ALL[idx] {
        Action::Run => run_pipeline(&workspace, config, multi)?,
        Action::Import => {
            let path: String = Input::new()
                .with_prompt("GeoJSON file")
                .interact_text()?;
            let name = prompt_subset("Subset name", &config.input)?;
            commands::import(&workspace, config, &PathBuf::from(path.trim()), &name)?;
        }
        Action::Totals => {
            let subset = prompt_existing_subset(&workspace, "Subset", &config.input)?;
            let totals = commands::totals(&workspace, config, &subset)?;
            println!("{}", report::format_totals(&subset, &totals));
        }
        Action::Report => {
            let table: String = Input::new()
                .with_prompt("Summary table")
                .default(config.summary_table_name())
                .interact_text()?;
            let csv: String = Input::new()
                .with_prompt("CSV path (empty to print)")
                .allow_empty(true)
                .interact_text()?;
            let csv = Some(csv.trim()).filter(|p| !p.is_empty()).map(PathBuf::from);
            commands::report(&workspace, table.trim(), csv.as_deref())?;
        }
        Action::Export => {
            let subset = prompt_existing_subset(&workspace, "Subset", &config.input)?;
            let path: String = Input::new()
                .with_prompt("Output file")
                .default(format!("{subset}.geojson"))
                .interact_text()?;
            commands::export(&workspace, &subset, &PathBuf::from(path.trim()))?;
        }
        Action::ListSubsets => {
            for info in commands::subsets(&workspace)? {
                println!("{:<32} {:>10} features", info.name, info.features);
            }
        }
    }

    Ok(())
}

/// Prompts for the run settings, then runs the pipeline.
fn run_pipeline(
    workspace: &FeatureWorkspace,
    config: &mut AnalysisConfig,
    multi: &MultiProgress,
) -> Result<(), Box<dyn std::error::Error>> {
    config.input = prompt_existing_subset(workspace, "Input subset", &config.input)?;

    let first: i32 = Input::new().with_prompt("First year").default(2019).interact_text()?;
    let last: i32 = Input::new()
        .with_prompt("Last year (inclusive)")
        .default(first.max(2020))
        .interact_text()?;
    config.years = YearSelection::Range {
        start: first,
        end: last,
    };

    config.annotate_records = Confirm::new()
        .with_prompt("Annotate year subsets with per-record shares?")
        .default(config.annotate_records)
        .interact()?;

    let strict = Confirm::new()
        .with_prompt("Fail on records missing acreage or dates?")
        .default(config.missing_fields == MissingFieldPolicy::Fail)
        .interact()?;
    config.missing_fields = if strict {
        MissingFieldPolicy::Fail
    } else {
        MissingFieldPolicy::Skip
    };

    let command: String = Input::new()
        .with_prompt("Hot spot command (empty to skip)")
        .default(config.hotspot.command.clone().unwrap_or_default())
        .allow_empty(true)
        .interact_text()?;
    config.hotspot.command = Some(command.trim().to_string()).filter(|c| !c.is_empty());

    let progress = IndicatifProgress::steps_bar(multi, "Summarizing");
    let report = commands::run(workspace, config, &progress)?;

    print!("{}", report::format_table(&report.rows));
    Ok(())
}

/// Offers the existing subsets, falling back to free text when the
/// workspace is empty.
fn prompt_existing_subset(
    workspace: &FeatureWorkspace,
    prompt: &str,
    default: &str,
) -> Result<String, Box<dyn std::error::Error>> {
    let names: Vec<String> = commands::subsets(workspace)?
        .into_iter()
        .map(|s| s.name)
        .collect();

    if names.is_empty() {
        return prompt_subset(prompt, default);
    }

    let idx = Select::new()
        .with_prompt(prompt)
        .items(&names)
        .default(names.iter().position(|n| n == default).unwrap_or(0))
        .interact()?;

    Ok(names[idx].clone())
}

fn prompt_subset(prompt: &str, default: &str) -> Result<String, Box<dyn std::error::Error>> {
    let name: String = Input::new()
        .with_prompt(prompt)
        .default(default.to_string())
        .interact_text()?;
    Ok(name.trim().to_string())
}
