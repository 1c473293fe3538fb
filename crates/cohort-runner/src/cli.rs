//! Command-line arguments.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Parser;

/// Build claims-based cohorts from a criteria file.
#[derive(Debug, Clone, Parser)]
#[command(name = "cohort-runner", version, about)]
pub struct Args {
    /// Directory holding the claims tables.
    #[arg(long, env = "COHORT_DATA_PATH")]
    pub data_dir: PathBuf,

    /// Cohort criteria YAML file.
    #[arg(long, env = "COHORT_CRITERIA_PATH")]
    pub criteria: PathBuf,

    /// Cohorts to build, comma separated. Defaults to every cohort in file order.
    #[arg(long, value_delimiter = ',')]
    pub cohorts: Vec<String>,

    /// Output directory. Defaults to `outputs/<timestamp>`.
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Write only the combined outputs.
    #[arg(long)]
    pub combined_only: bool,

    /// Log a failed cohort and continue with the rest.
    #[arg(long)]
    pub keep_going: bool,

    /// Field delimiter of the claims tables.
    #[arg(long, default_value_t = ',')]
    pub delimiter: char,

    /// "Today" for relative date ranges (YYYY-MM-DD). Defaults to the current date.
    #[arg(long)]
    pub reference_date: Option<NaiveDate>,

    /// Load tables one at a time instead of concurrently.
    #[arg(long)]
    pub sequential_load: bool,
}

impl Args {
    /// The output directory, defaulting to a timestamped one under `outputs/`.
    pub fn resolved_output_dir(&self, timestamp: &str) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("outputs").join(timestamp))
    }
}
