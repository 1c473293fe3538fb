//! Cohort output files.
//!
//! Per cohort: `<cohort>.csv` and `<cohort>_metadata.json`. Combined:
//! `combined_cohorts.csv` and `combined_cohorts_metadata.json`.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use cohort_engine::{CohortSpec, CohortTable, CombinedCohorts};
use cohort_types::CohortResult;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::info;

const DATE_FORMAT: &str = "%Y-%m-%d";
const COMBINED_STEM: &str = "combined_cohorts";

/// Errors writing outputs.
#[derive(Error, Debug)]
pub enum OutputError {
    /// I/O error.
    #[error("IO error writing {path}: {source}")]
    Io {
        /// The file or directory being written.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// CSV writing error.
    #[error("CSV writing error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON writing error.
    #[error("JSON writing error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for output operations.
pub type OutputResult<T> = Result<T, OutputError>;

#[derive(Debug, Serialize)]
struct CohortMetadata<'a> {
    cohort: &'a str,
    inclusion: &'a Value,
    exclusion: &'a Value,
    tags: Option<&'a Value>,
    timestamp: &'a str,
    n_records: usize,
}

#[derive(Debug, Serialize)]
struct DateRange {
    earliest: Option<String>,
    latest: Option<String>,
}

#[derive(Debug, Serialize)]
struct CombinedMetadata<'a> {
    total_patients: usize,
    cohorts: &'a [String],
    cohort_counts: &'a IndexMap<String, usize>,
    date_range: DateRange,
    timestamp: &'a str,
    columns: Vec<String>,
}

/// Writes cohort outputs into one directory.
#[derive(Debug, Clone)]
pub struct OutputWriter {
    dir: PathBuf,
    timestamp: String,
}

impl OutputWriter {
    /// Creates the output directory if needed.
    pub fn create(dir: impl Into<PathBuf>, timestamp: impl Into<String>) -> OutputResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| OutputError::Io {
            path: dir.display().to_string(),
            source,
        })?;
        Ok(Self {
            dir,
            timestamp: timestamp.into(),
        })
    }

    /// Output directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes `<cohort>.csv` and `<cohort>_metadata.json`.
    pub fn write_cohort(&self, table: &CohortTable, spec: &CohortSpec) -> OutputResult<PathBuf> {
        let csv_path = self.dir.join(format!("{}.csv", table.cohort));
        write_rows(&csv_path, &table.header(), &table.rows)?;

        let metadata = CohortMetadata {
            cohort: &table.cohort,
            inclusion: spec.raw_inclusion(),
            exclusion: spec.raw_exclusion(),
            tags: spec.tags.as_ref(),
            timestamp: &self.timestamp,
            n_records: table.len(),
        };
        self.write_json(&format!("{}_metadata.json", table.cohort), &metadata)?;

        info!(cohort = %table.cohort, rows = table.len(), path = %csv_path.display(), "Wrote cohort");
        Ok(csv_path)
    }

    /// Writes `combined_cohorts.csv` and `combined_cohorts_metadata.json`.
    pub fn write_combined(&self, combined: &CombinedCohorts) -> OutputResult<PathBuf> {
        let csv_path = self.dir.join(format!("{COMBINED_STEM}.csv"));
        let header = combined.header();
        write_rows(&csv_path, &header, &combined.rows)?;

        let range = combined.date_range();
        let metadata = CombinedMetadata {
            total_patients: combined.total_patients(),
            cohorts: &combined.cohorts,
            cohort_counts: &combined.cohort_counts,
            date_range: DateRange {
                earliest: range.map(|(earliest, _)| earliest.format(DATE_FORMAT).to_string()),
                latest: range.map(|(_, latest)| latest.format(DATE_FORMAT).to_string()),
            },
            timestamp: &self.timestamp,
            columns: header,
        };
        self.write_json(&format!("{COMBINED_STEM}_metadata.json"), &metadata)?;

        info!(
            rows = combined.len(),
            members = combined.distinct_members(),
            path = %csv_path.display(),
            "Wrote combined cohorts"
        );
        Ok(csv_path)
    }

    fn write_json<T: Serialize>(&self, name: &str, value: &T) -> OutputResult<()> {
        let path = self.dir.join(name);
        let file = File::create(&path).map_err(|source| OutputError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::to_writer_pretty(BufWriter::new(file), value)?;
        Ok(())
    }
}

fn write_rows(path: &Path, header: &[String], rows: &[CohortResult]) -> OutputResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(header)?;
    for row in rows {
        let index_date = row.index_date.format(DATE_FORMAT).to_string();
        let mut record = Vec::with_capacity(row.demographics.len() + 3);
        record.push(row.member_id.as_str());
        record.push(index_date.as_str());
        record.extend(row.demographics.iter().map(String::as_str));
        record.push(row.cohort.as_str());
        writer.write_record(&record)?;
    }
    writer.flush().map_err(|source| OutputError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(())
}
