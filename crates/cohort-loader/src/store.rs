//! In-memory claims store.
//!
//! Loads the five claims tables, joins code rows onto their encounters and
//! indexes the joined claims by code. Table loading runs concurrently via
//! rayon when the `parallel` feature is enabled.
//!
//! ```ignore
//! let tables = discover_claims_tables("/data/claims")?;
//! let store = ClaimsStore::load_all(&tables, &LoadConfig::default())?;
//! println!("{} diagnosis claims", store.diagnosis_count());
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;

use cohort_types::{
    Claim, ClaimEntry, DiagnosisEntry, DrugClaim, DrugEntry, Member, MemberId, ProcedureClaim,
    ProcedureEntry,
};
use tracing::{info, warn};

use crate::member::demographic_columns;
use crate::parser::{TableParser, TableRecord};
use crate::types::{ClaimsError, ClaimsResult, ClaimsTables, LoadConfig, LoadStats};

/// Raw rows of every claims table.
#[derive(Debug, Clone, Default)]
pub struct ClaimsTableRows {
    /// `claims_entries` rows.
    pub entries: Vec<ClaimEntry>,
    /// `claims_diagnoses` rows.
    pub diagnoses: Vec<DiagnosisEntry>,
    /// `claims_procedures` rows.
    pub procedures: Vec<ProcedureEntry>,
    /// `claims_drugs` rows.
    pub drugs: Vec<DrugEntry>,
    /// `members` rows.
    pub members: Vec<Member>,
    /// Demographic column names of the `members` table.
    pub demographic_columns: Vec<String>,
}

/// In-memory store of joined claims.
///
/// Immutable once built, so a shared reference can serve parallel cohort
/// builds without locking.
#[derive(Default)]
pub struct ClaimsStore {
    pub(crate) diagnoses: Vec<Claim>,
    pub(crate) procedures: Vec<ProcedureClaim>,
    pub(crate) drugs: Vec<DrugClaim>,
    /// Diagnosis claim positions by exact code.
    pub(crate) diagnoses_by_code: HashMap<String, Vec<usize>>,
    /// Procedure claim positions by exact code.
    pub(crate) procedures_by_code: HashMap<String, Vec<usize>>,
    pub(crate) members: HashMap<MemberId, Member>,
    pub(crate) demographic_columns: Vec<String>,
    stats: LoadStats,
}

impl std::fmt::Debug for ClaimsStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClaimsStore")
            .field("diagnoses", &self.diagnoses.len())
            .field("procedures", &self.procedures.len())
            .field("drugs", &self.drugs.len())
            .field("diagnosis_codes", &self.diagnoses_by_code.len())
            .field("procedure_codes", &self.procedures_by_code.len())
            .field("members", &self.members.len())
            .field("demographic_columns", &self.demographic_columns)
            .finish()
    }
}

fn read_table<T: TableRecord>(path: &Path, config: &LoadConfig) -> ClaimsResult<Vec<T>> {
    let rows = TableParser::<_, T>::from_path(path, config)?.parse_all()?;
    info!(table = T::TABLE, rows = rows.len(), "Loaded claims table");
    Ok(rows)
}

fn read_members(path: &Path, config: &LoadConfig) -> ClaimsResult<(Vec<Member>, Vec<String>)> {
    let parser = TableParser::<_, Member>::from_path(path, config)?;
    let columns = demographic_columns(parser.columns());
    let members = parser.parse_all()?;
    info!(table = Member::TABLE, rows = members.len(), "Loaded claims table");
    Ok((members, columns))
}

fn required_path<'a>(
    tables: &ClaimsTables,
    path: &'a Option<std::path::PathBuf>,
    table: &str,
) -> ClaimsResult<&'a Path> {
    path.as_deref().ok_or_else(|| ClaimsError::MissingTable {
        tables: table.to_string(),
        directory: tables.directory_display(),
    })
}

impl ClaimsStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads and joins every table sequentially.
    ///
    /// # Errors
    /// Returns the first schema or row error; nothing is partially loaded.
    pub fn load_all(tables: &ClaimsTables, config: &LoadConfig) -> ClaimsResult<Self> {
        let start = Instant::now();
        tables.require_all()?;
        let (members, demographic_columns) =
            read_members(required_path(tables, &tables.members, Member::TABLE)?, config)?;
        let rows = ClaimsTableRows {
            entries: read_table(
                required_path(tables, &tables.claims_entries, ClaimEntry::TABLE)?,
                config,
            )?,
            diagnoses: read_table(
                required_path(tables, &tables.claims_diagnoses, DiagnosisEntry::TABLE)?,
                config,
            )?,
            procedures: read_table(
                required_path(tables, &tables.claims_procedures, ProcedureEntry::TABLE)?,
                config,
            )?,
            drugs: read_table(
                required_path(tables, &tables.claims_drugs, DrugEntry::TABLE)?,
                config,
            )?,
            members,
            demographic_columns,
        };
        Ok(Self::from_rows(rows).with_load_time(start))
    }

    /// Loads every table concurrently (each table parsed on its own task),
    /// then joins.
    #[cfg(feature = "parallel")]
    pub fn load_all_parallel(tables: &ClaimsTables, config: &LoadConfig) -> ClaimsResult<Self> {
        let start = Instant::now();
        tables.require_all()?;
        let entries_path = required_path(tables, &tables.claims_entries, ClaimEntry::TABLE)?;
        let diagnoses_path = required_path(tables, &tables.claims_diagnoses, DiagnosisEntry::TABLE)?;
        let procedures_path = required_path(tables, &tables.claims_procedures, ProcedureEntry::TABLE)?;
        let drugs_path = required_path(tables, &tables.claims_drugs, DrugEntry::TABLE)?;
        let members_path = required_path(tables, &tables.members, Member::TABLE)?;

        // Parse all tables in parallel using nested rayon::join
        let ((entries, diagnoses), ((procedures, drugs), members)) = rayon::join(
            || {
                rayon::join(
                    || read_table::<ClaimEntry>(entries_path, config),
                    || read_table::<DiagnosisEntry>(diagnoses_path, config),
                )
            },
            || {
                rayon::join(
                    || {
                        rayon::join(
                            || read_table::<ProcedureEntry>(procedures_path, config),
                            || read_table::<DrugEntry>(drugs_path, config),
                        )
                    },
                    || read_members(members_path, config),
                )
            },
        );

        let (members, demographic_columns) = members?;
        let rows = ClaimsTableRows {
            entries: entries?,
            diagnoses: diagnoses?,
            procedures: procedures?,
            drugs: drugs?,
            members,
            demographic_columns,
        };
        Ok(Self::from_rows(rows).with_load_time(start))
    }

    /// Joins raw table rows into a store.
    ///
    /// Code rows whose encounter id is unknown are dropped and counted in
    /// [`LoadStats::orphan_rows`]. A repeated encounter id keeps its first row.
    pub fn from_rows(rows: ClaimsTableRows) -> Self {
        let mut stats = LoadStats {
            entries: rows.entries.len(),
            members: rows.members.len(),
            ..Default::default()
        };

        let mut entries: HashMap<&str, &ClaimEntry> = HashMap::with_capacity(rows.entries.len());
        for entry in &rows.entries {
            entries.entry(entry.claim_entry_id.as_str()).or_insert(entry);
        }

        let mut orphans = 0usize;
        let diagnoses: Vec<Claim> = rows
            .diagnoses
            .into_iter()
            .filter_map(|row| match entries.get(row.claim_entry_id.as_str()) {
                Some(entry) => Some(Claim::join(entry, row)),
                None => {
                    orphans += 1;
                    None
                }
            })
            .collect();
        let procedures: Vec<ProcedureClaim> = rows
            .procedures
            .into_iter()
            .filter_map(|row| match entries.get(row.claim_entry_id.as_str()) {
                Some(entry) => Some(ProcedureClaim::join(entry, row)),
                None => {
                    orphans += 1;
                    None
                }
            })
            .collect();
        let drugs: Vec<DrugClaim> = rows
            .drugs
            .into_iter()
            .filter_map(|row| match entries.get(row.claim_entry_id.as_str()) {
                Some(entry) => Some(DrugClaim::join(entry, row)),
                None => {
                    orphans += 1;
                    None
                }
            })
            .collect();

        if orphans > 0 {
            warn!(rows = orphans, "Dropped code rows with unknown claim_entry_id");
        }
        stats.orphan_rows = orphans;
        stats.diagnoses = diagnoses.len();
        stats.procedures = procedures.len();
        stats.drugs = drugs.len();

        let mut diagnoses_by_code: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, claim) in diagnoses.iter().enumerate() {
            diagnoses_by_code
                .entry(claim.diagnosis_code.clone())
                .or_default()
                .push(i);
        }
        let mut procedures_by_code: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, claim) in procedures.iter().enumerate() {
            procedures_by_code
                .entry(claim.proc_code.clone())
                .or_default()
                .push(i);
        }

        let mut members = HashMap::with_capacity(rows.members.len());
        for member in rows.members {
            members.entry(member.member_id.clone()).or_insert(member);
        }

        Self {
            diagnoses,
            procedures,
            drugs,
            diagnoses_by_code,
            procedures_by_code,
            members,
            demographic_columns: rows.demographic_columns,
            stats,
        }
    }

    fn with_load_time(mut self, start: Instant) -> Self {
        self.stats.load_time_ms = start.elapsed().as_millis() as u64;
        info!(
            diagnoses = self.stats.diagnoses,
            procedures = self.stats.procedures,
            drugs = self.stats.drugs,
            members = self.stats.members,
            orphans = self.stats.orphan_rows,
            elapsed_ms = self.stats.load_time_ms,
            "Claims store ready"
        );
        self
    }

    /// Load statistics.
    pub fn stats(&self) -> &LoadStats {
        &self.stats
    }

    /// Returns the number of joined diagnosis claims.
    pub fn diagnosis_count(&self) -> usize {
        self.diagnoses.len()
    }

    /// Returns the number of joined procedure claims.
    pub fn procedure_count(&self) -> usize {
        self.procedures.len()
    }

    /// Returns the number of joined drug claims.
    pub fn drug_count(&self) -> usize {
        self.drugs.len()
    }

    /// Returns the number of members.
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Returns the number of distinct diagnosis codes.
    pub fn distinct_diagnosis_codes(&self) -> usize {
        self.diagnoses_by_code.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cohort_types::ClaimType;

    fn entry(id: &str, member: &str, date: &str, claim_type: &str) -> ClaimEntry {
        ClaimEntry {
            claim_entry_id: id.to_string(),
            member_id: member.to_string(),
            date_of_service: date.parse().unwrap(),
            claim_type: ClaimType::from(claim_type),
        }
    }

    fn dx(id: &str, code: &str) -> DiagnosisEntry {
        DiagnosisEntry {
            claim_entry_id: id.to_string(),
            icd_code: code.to_string(),
        }
    }

    #[test]
    fn test_load_reports_missing_tables_with_directory() {
        let mut tables = ClaimsTables::in_directory("/data/claims");
        tables.set("members", "/data/claims/members.csv".into());
        let err = ClaimsStore::load_all(&tables, &LoadConfig::default()).unwrap_err();
        match err {
            ClaimsError::MissingTable { tables, directory } => {
                assert_eq!(
                    tables,
                    "claims_entries, claims_diagnoses, claims_procedures, claims_drugs"
                );
                assert_eq!(directory, "/data/claims");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_join_and_orphans() {
        let store = ClaimsStore::from_rows(ClaimsTableRows {
            entries: vec![
                entry("CE1", "M1", "2023-01-01", "medical"),
                entry("CE2", "M1", "2023-02-01", "pharma"),
            ],
            diagnoses: vec![dx("CE1", "I10"), dx("CE1", "E11.9"), dx("CE9", "I10")],
            procedures: vec![ProcedureEntry {
                claim_entry_id: "CE8".to_string(),
                proc_code: "93000".to_string(),
            }],
            drugs: vec![DrugEntry {
                claim_entry_id: "CE2".to_string(),
                product_service_name: "METFORMIN".to_string(),
            }],
            members: vec![Member::new("M1", vec!["F".to_string()])],
            demographic_columns: vec!["gender".to_string()],
        });

        assert_eq!(store.diagnosis_count(), 2);
        assert_eq!(store.procedure_count(), 0);
        assert_eq!(store.drug_count(), 1);
        assert_eq!(store.stats().orphan_rows, 2);
        assert_eq!(store.stats().joined_rows(), 3);
        assert_eq!(store.distinct_diagnosis_codes(), 2);

        assert!(store
            .diagnoses
            .iter()
            .all(|c| c.member_id == "M1" && c.date_of_service.to_string() == "2023-01-01"));
        assert!(store.drugs[0].claim_type.is_pharmacy());
    }
}
