//! Loader-specific types for claims table processing.

use std::path::PathBuf;

use cohort_types::well_known;
use thiserror::Error;

/// Errors that can occur while loading claims tables.
#[derive(Error, Debug)]
pub enum ClaimsError {
    /// I/O error reading a table.
    #[error("IO error reading claims table: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing error.
    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    /// Data directory does not exist.
    #[error("Directory not found: {path}")]
    DirectoryNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Required tables missing from the data directory.
    #[error("Required claims table(s) not found: {tables} in {directory}")]
    MissingTable {
        /// Comma-separated names of the missing tables.
        tables: String,
        /// The directory that was searched.
        directory: String,
    },

    /// Required column missing from a table header.
    #[error("Table '{table}' is missing required column: {column}")]
    MissingColumn {
        /// The table being read.
        table: String,
        /// The name of the missing column.
        column: String,
    },

    /// A required field is absent or blank.
    #[error("Missing value for '{column}' in table '{table}'")]
    MissingField {
        /// The table being read.
        table: String,
        /// The column without a value.
        column: String,
    },

    /// Invalid date format.
    #[error("Invalid date format: {value} (expected YYYY-MM-DD)")]
    InvalidDate {
        /// The invalid date value.
        value: String,
    },

    /// A row-level error with its position.
    #[error("{table} line {line}: {source}")]
    Row {
        /// The table being read.
        table: String,
        /// 1-based line number, header included.
        line: u64,
        /// The underlying error.
        #[source]
        source: Box<ClaimsError>,
    },
}

/// Result type for loader operations.
pub type ClaimsResult<T> = Result<T, ClaimsError>;

/// Configuration for table parsing.
#[derive(Debug, Clone)]
pub struct LoadConfig {
    /// Field delimiter.
    pub delimiter: u8,
    /// Whether to trim whitespace around fields.
    pub trim: bool,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            delimiter: b',',
            trim: true,
        }
    }
}

impl LoadConfig {
    /// Tab-delimited tables.
    pub fn tab_delimited() -> Self {
        Self {
            delimiter: b'\t',
            ..Self::default()
        }
    }
}

/// Statistics from loading the claims tables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadStats {
    /// Encounter rows loaded.
    pub entries: usize,
    /// Diagnosis rows joined to an encounter.
    pub diagnoses: usize,
    /// Procedure rows joined to an encounter.
    pub procedures: usize,
    /// Drug rows joined to an encounter.
    pub drugs: usize,
    /// Member rows loaded.
    pub members: usize,
    /// Code rows dropped because their encounter id is unknown.
    pub orphan_rows: usize,
    /// Time taken to load in milliseconds.
    pub load_time_ms: u64,
}

impl LoadStats {
    /// Total code rows joined to an encounter.
    pub fn joined_rows(&self) -> usize {
        self.diagnoses + self.procedures + self.drugs
    }
}

/// Discovered claims tables in a data directory.
#[derive(Debug, Clone, Default)]
pub struct ClaimsTables {
    /// Path to the encounter table.
    pub claims_entries: Option<PathBuf>,
    /// Path to the diagnosis table.
    pub claims_diagnoses: Option<PathBuf>,
    /// Path to the procedure table.
    pub claims_procedures: Option<PathBuf>,
    /// Path to the drug table.
    pub claims_drugs: Option<PathBuf>,
    /// Path to the member demographics table.
    pub members: Option<PathBuf>,
    /// Directory the tables were discovered in.
    pub directory: Option<PathBuf>,
}

impl ClaimsTables {
    /// Creates a new empty ClaimsTables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty ClaimsTables rooted at `directory`.
    pub fn in_directory(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: Some(directory.into()),
            ..Self::default()
        }
    }

    /// Directory for error messages: the discovery directory, else the
    /// parent of the first known table.
    pub fn directory_display(&self) -> String {
        let known = [
            &self.claims_entries,
            &self.claims_diagnoses,
            &self.claims_procedures,
            &self.claims_drugs,
            &self.members,
        ];
        self.directory
            .as_deref()
            .or_else(|| known.iter().find_map(|p| p.as_deref().and_then(|p| p.parent())))
            .map(|dir| dir.display().to_string())
            .unwrap_or_else(|| ".".to_string())
    }

    /// Fails with [`ClaimsError::MissingTable`] naming every absent table.
    pub fn require_all(&self) -> ClaimsResult<()> {
        let missing = self.missing_tables();
        if missing.is_empty() {
            return Ok(());
        }
        Err(ClaimsError::MissingTable {
            tables: missing.join(", "),
            directory: self.directory_display(),
        })
    }

    /// Assigns a path by table name. Returns false for unknown names.
    pub fn set(&mut self, table: &str, path: PathBuf) -> bool {
        let slot = match table {
            well_known::CLAIMS_ENTRIES_TABLE => &mut self.claims_entries,
            well_known::CLAIMS_DIAGNOSES_TABLE => &mut self.claims_diagnoses,
            well_known::CLAIMS_PROCEDURES_TABLE => &mut self.claims_procedures,
            well_known::CLAIMS_DRUGS_TABLE => &mut self.claims_drugs,
            well_known::MEMBERS_TABLE => &mut self.members,
            _ => return false,
        };
        *slot = Some(path);
        true
    }

    /// Returns true if every table is present.
    pub fn has_required_tables(&self) -> bool {
        self.missing_tables().is_empty()
    }

    /// Returns the names of missing tables.
    pub fn missing_tables(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.claims_entries.is_none() {
            missing.push(well_known::CLAIMS_ENTRIES_TABLE);
        }
        if self.claims_diagnoses.is_none() {
            missing.push(well_known::CLAIMS_DIAGNOSES_TABLE);
        }
        if self.claims_procedures.is_none() {
            missing.push(well_known::CLAIMS_PROCEDURES_TABLE);
        }
        if self.claims_drugs.is_none() {
            missing.push(well_known::CLAIMS_DRUGS_TABLE);
        }
        if self.members.is_none() {
            missing.push(well_known::MEMBERS_TABLE);
        }
        missing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_config_default() {
        let config = LoadConfig::default();
        assert_eq!(config.delimiter, b',');
        assert!(config.trim);
        assert_eq!(LoadConfig::tab_delimited().delimiter, b'\t');
    }

    #[test]
    fn test_claims_tables_missing() {
        let mut tables = ClaimsTables::new();
        assert!(tables.set("claims_entries", PathBuf::from("claims_entries.csv")));
        assert!(tables.set("members", PathBuf::from("members.csv")));
        assert!(!tables.set("claims_labs", PathBuf::from("claims_labs.csv")));

        assert!(!tables.has_required_tables());
        let missing = tables.missing_tables();
        assert_eq!(
            missing,
            vec!["claims_diagnoses", "claims_procedures", "claims_drugs"]
        );
    }

    #[test]
    fn test_missing_table_names_directory() {
        let mut tables = ClaimsTables::new();
        tables.set("members", PathBuf::from("/data/claims/members.csv"));
        let err = tables.require_all().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Required claims table(s) not found: claims_entries, claims_diagnoses, \
             claims_procedures, claims_drugs in /data/claims"
        );

        let err = ClaimsTables::in_directory("/srv/in").require_all().unwrap_err();
        assert!(err.to_string().ends_with(" in /srv/in"));
        assert!(ClaimsTables::new().require_all().unwrap_err().to_string().ends_with(" in ."));
    }

    #[test]
    fn test_row_error_display() {
        let err = ClaimsError::Row {
            table: "claims_entries".to_string(),
            line: 3,
            source: Box::new(ClaimsError::InvalidDate {
                value: "01/02/2023".to_string(),
            }),
        };
        assert_eq!(
            err.to_string(),
            "claims_entries line 3: Invalid date format: 01/02/2023 (expected YYYY-MM-DD)"
        );
    }

    #[test]
    fn test_joined_rows() {
        let stats = LoadStats {
            diagnoses: 5,
            procedures: 2,
            drugs: 1,
            ..Default::default()
        };
        assert_eq!(stats.joined_rows(), 8);
    }
}
