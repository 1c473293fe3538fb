//! Claims table discovery.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::types::{ClaimsError, ClaimsResult, ClaimsTables};

/// File extensions recognised as tables.
const TABLE_EXTENSIONS: &[&str] = &["csv", "tsv", "txt"];

/// Discovers claims tables in a data directory.
///
/// A file belongs to a table when its stem equals the table name
/// (`claims_entries.csv`, `members.tsv`). Other files are ignored.
///
/// # Errors
/// Returns [`ClaimsError::DirectoryNotFound`] if `path` is not a directory
/// and [`ClaimsError::MissingTable`] naming every absent table.
pub fn discover_claims_tables<P: AsRef<Path>>(path: P) -> ClaimsResult<ClaimsTables> {
    let path = path.as_ref();

    if !path.is_dir() {
        return Err(ClaimsError::DirectoryNotFound {
            path: path.display().to_string(),
        });
    }

    let mut tables = ClaimsTables::in_directory(path);

    let mut entries: Vec<_> = fs::read_dir(path)?.collect::<Result<_, _>>()?;
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let file_path = entry.path();
        if !file_path.is_file() {
            continue;
        }

        let extension = file_path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        if !extension.is_some_and(|e| TABLE_EXTENSIONS.contains(&e.as_str())) {
            continue;
        }

        let Some(stem) = file_path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let stem = stem.to_string();
        if tables.set(&stem, file_path.clone()) {
            debug!(table = %stem, path = %file_path.display(), "Discovered claims table");
        }
    }

    tables.require_all()?;
    Ok(tables)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), "").unwrap();
    }

    #[test]
    fn test_discover_all_tables() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "claims_entries.csv",
            "claims_diagnoses.csv",
            "claims_procedures.CSV",
            "claims_drugs.tsv",
            "members.csv",
            "notes.md",
            "claims_labs.csv",
        ] {
            touch(dir.path(), name);
        }

        let tables = discover_claims_tables(dir.path()).unwrap();
        assert!(tables.has_required_tables());
        assert_eq!(
            tables.claims_drugs.unwrap().file_name().unwrap(),
            "claims_drugs.tsv"
        );
    }

    #[test]
    fn test_discover_reports_missing_tables() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "claims_entries.csv");
        touch(dir.path(), "members.csv");

        let err = discover_claims_tables(dir.path()).unwrap_err();
        match err {
            ClaimsError::MissingTable { tables, .. } => {
                assert_eq!(tables, "claims_diagnoses, claims_procedures, claims_drugs");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_discover_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = discover_claims_tables(dir.path().join("absent")).unwrap_err();
        assert!(matches!(err, ClaimsError::DirectoryNotFound { .. }));
    }
}
