#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI for the fire perimeter statistics pipeline.
//!
//! Runs a single subcommand against the `DuckDB` feature workspace, or the
//! interactive menu when none is given.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use fire_perimeter_analysis::config::{AnalysisConfig, RunOverrides};
use fire_perimeter_analysis::{commands, interactive, report};
use fire_perimeter_cli_utils::{IndicatifProgress, MultiProgress};
use fire_perimeter_models::{MissingFieldPolicy, YearSelection};

#[derive(Parser)]
#[command(
    name = "fire_perimeter_analysis",
    about = "Yearly fire perimeter statistics and hot spot analysis"
)]
struct Cli {
    /// TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// `DuckDB` workspace file (overrides config and `FIRE_WORKSPACE`)
    #[arg(long, global = true)]
    workspace: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a perimeter `GeoJSON` file into the workspace
    Import {
        /// `GeoJSON` `FeatureCollection` to load
        path: PathBuf,

        /// Subset name (defaults to the configured input)
        #[arg(long)]
        name: Option<String>,
    },
    /// Run the yearly summary pipeline
    Run {
        /// Comma-separated years of interest
        #[arg(long, value_delimiter = ',', conflicts_with_all = ["start_year", "end_year"])]
        years: Option<Vec<i32>>,

        /// First year of an inclusive range
        #[arg(long, requires = "end_year")]
        start_year: Option<i32>,

        /// Last year of an inclusive range
        #[arg(long, requires = "start_year")]
        end_year: Option<i32>,

        /// Input subset
        #[arg(long)]
        input: Option<String>,

        /// Summary table name
        #[arg(long)]
        table: Option<String>,

        /// Write per-record shares onto each year subset
        #[arg(long)]
        annotate: bool,

        /// Treatment of records missing acreage or dates
        #[arg(long)]
        missing_fields: Option<MissingFieldPolicy>,

        /// External hot spot program
        #[arg(long)]
        hotspot_command: Option<String>,
    },
    /// Print dataset totals for a subset
    Totals {
        /// Subset (defaults to the configured input)
        #[arg(long)]
        subset: Option<String>,
    },
    /// Print a summary table or write it as CSV
    Report {
        /// Summary table (defaults to the configured one)
        #[arg(long)]
        table: Option<String>,

        /// Write CSV here instead of printing
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Write a subset as `GeoJSON`
    Export {
        /// Subset to export
        subset: String,

        /// Output file
        path: PathBuf,
    },
    /// List the subsets in the workspace
    Subsets,
}

fn main() -> ExitCode {
    let multi = fire_perimeter_cli_utils::init_logger();
    let cli = Cli::parse();

    match run(cli, &multi) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli, multi: &MultiProgress) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AnalysisConfig::load_or_default(cli.config.as_deref())?;
    config.apply(RunOverrides {
        workspace: cli.workspace,
        ..RunOverrides::default()
    });

    let Some(command) = cli.command else {
        return interactive::run(&mut config, multi);
    };

    match command {
        Commands::Import { path, name } => {
            let workspace = commands::open_workspace(&config)?;
            let name = name.unwrap_or_else(|| config.input.clone());
            commands::import(&workspace, &config, &path, &name)?;
        }
        Commands::Run {
            years,
            start_year,
            end_year,
            input,
            table,
            annotate,
            missing_fields,
            hotspot_command,
        } => {
            let years = match (years, start_year, end_year) {
                (Some(list), _, _) => Some(YearSelection::List { list }),
                (None, Some(start), Some(end)) => Some(YearSelection::Range { start, end }),
                _ => None,
            };
            config.apply(RunOverrides {
                input,
                summary_table: table,
                years,
                missing_fields,
                annotate,
                hotspot_command,
                ..RunOverrides::default()
            });

            let workspace = commands::open_workspace(&config)?;
            let progress = IndicatifProgress::steps_bar(multi, "Summarizing");
            let report = commands::run(&workspace, &config, &progress)?;

            print!("{}", report::format_table(&report.rows));
            log::info!(
                "Summary table '{}', merged subset '{}' ({} records)",
                report.summary_table,
                report.merged_subset,
                report.merged_records,
            );
            if let Some(output) = &report.hotspot_output {
                log::info!("Hot spot subset '{output}'");
            }
        }
        Commands::Totals { subset } => {
            let workspace = commands::open_workspace(&config)?;
            let subset = subset.unwrap_or_else(|| config.input.clone());
            let totals = commands::totals(&workspace, &config, &subset)?;
            println!("{}", report::format_totals(&subset, &totals));
        }
        Commands::Report { table, csv } => {
            let workspace = commands::open_workspace(&config)?;
            let table = table.unwrap_or_else(|| config.summary_table_name());
            commands::report(&workspace, &table, csv.as_deref())?;
        }
        Commands::Export { subset, path } => {
            let workspace = commands::open_workspace(&config)?;
            commands::export(&workspace, &subset, &path)?;
        }
        Commands::Subsets => {
            let workspace = commands::open_workspace(&config)?;
            for info in commands::subsets(&workspace)? {
                println!("{:<32} {:>10} features", info.name, info.features);
            }
        }
    }

    Ok(())
}
