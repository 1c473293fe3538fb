//! # cohort-runner
//!
//! Command-line runner that loads a claims directory, builds the cohorts of
//! a criteria file and writes their outputs.

#![warn(missing_docs)]

pub mod cli;
pub mod output;

use std::time::Instant;

use chrono::Local;
use cohort_engine::{
    CohortAssembler, CohortTable, CombinedCohorts, CriteriaConfig, EngineConfig, EngineError,
};
use cohort_loader::{discover_claims_tables, ClaimsError, ClaimsStore, LoadConfig};
use thiserror::Error;
use tracing::{error, info, warn};

pub use cli::Args;
pub use output::{OutputError, OutputWriter};

/// Timestamp format of default output directories.
pub const RUN_DIR_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Errors that end a run.
#[derive(Error, Debug)]
pub enum RunError {
    /// Claims tables could not be loaded.
    #[error(transparent)]
    Claims(#[from] ClaimsError),

    /// Criteria or cohort build error.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Outputs could not be written.
    #[error(transparent)]
    Output(#[from] OutputError),

    /// The delimiter is not a single-byte character.
    #[error("Delimiter must be a single ASCII character, got {0:?}")]
    InvalidDelimiter(char),
}

/// Outcome of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Cohorts built successfully, in order.
    pub built: Vec<String>,
    /// Cohorts that failed (only with `--keep-going`).
    pub failed: Vec<String>,
    /// Rows in the combined output.
    pub combined_rows: usize,
    /// Output directory.
    pub output_dir: std::path::PathBuf,
}

/// Runs the full pipeline for parsed arguments.
pub fn run(args: &Args) -> Result<RunSummary, RunError> {
    let start = Instant::now();
    let now = Local::now();

    let criteria = CriteriaConfig::from_path(&args.criteria).map_err(EngineError::from)?;
    info!(path = %args.criteria.display(), cohorts = criteria.len(), "Loaded criteria");

    let delimiter = u8::try_from(args.delimiter)
        .ok()
        .filter(u8::is_ascii)
        .ok_or(RunError::InvalidDelimiter(args.delimiter))?;
    let load_config = LoadConfig {
        delimiter,
        ..LoadConfig::default()
    };

    info!(path = %args.data_dir.display(), "Loading claims tables");
    let tables = discover_claims_tables(&args.data_dir)?;
    let store = if args.sequential_load {
        ClaimsStore::load_all(&tables, &load_config)?
    } else {
        ClaimsStore::load_all_parallel(&tables, &load_config)?
    };

    let mut engine_config = EngineConfig::builder();
    if let Some(date) = args.reference_date {
        engine_config = engine_config.with_reference_date(date);
    }
    let assembler = CohortAssembler::new(&store, &criteria).with_config(engine_config.build());

    let names: Vec<String> = if args.cohorts.is_empty() {
        criteria.cohort_names().map(str::to_string).collect()
    } else {
        args.cohorts.clone()
    };

    let output_dir = args.resolved_output_dir(&now.format(RUN_DIR_FORMAT).to_string());
    let writer = OutputWriter::create(&output_dir, now.to_rfc3339())?;

    let mut tables: Vec<CohortTable> = Vec::with_capacity(names.len());
    let mut failed = Vec::new();
    for name in &names {
        match assembler.build_cohort(name) {
            Ok(table) => {
                if !args.combined_only {
                    if let Some(spec) = criteria.cohort(name) {
                        writer.write_cohort(&table, spec)?;
                    }
                }
                tables.push(table);
            }
            Err(e) if args.keep_going => {
                error!(cohort = %name, error = %e, "Skipping failed cohort");
                failed.push(name.clone());
            }
            Err(e) => return Err(e.into()),
        }
    }

    let built: Vec<String> = tables.iter().map(|t| t.cohort.clone()).collect();
    let combined = CombinedCohorts::from_tables(tables);
    if combined.cohorts.is_empty() {
        warn!("No cohorts built; writing empty combined output");
    }
    writer.write_combined(&combined)?;

    info!(
        built = built.len(),
        failed = failed.len(),
        rows = combined.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Run complete"
    );

    Ok(RunSummary {
        built,
        failed,
        combined_rows: combined.len(),
        output_dir,
    })
}
