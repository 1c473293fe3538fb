//! `claims_entries` table parser.

use csv::StringRecord;
use cohort_types::{well_known, ClaimEntry, ClaimType};

use crate::parser::{parse, ColumnIndex, TableRecord};
use crate::types::ClaimsResult;

impl TableRecord for ClaimEntry {
    const TABLE: &'static str = well_known::CLAIMS_ENTRIES_TABLE;
    const REQUIRED_COLUMNS: &'static [&'static str] = &[
        well_known::CLAIM_ENTRY_ID_COLUMN,
        well_known::MEMBER_ID_COLUMN,
        well_known::DATE_OF_SERVICE_COLUMN,
        well_known::CLAIM_TYPE_COLUMN,
    ];

    fn from_record(record: &StringRecord, columns: &ColumnIndex) -> ClaimsResult<Self> {
        Ok(ClaimEntry {
            claim_entry_id: parse::text(columns.required(record, 0)?),
            member_id: parse::text(columns.required(record, 1)?),
            date_of_service: parse::date(columns.required(record, 2)?)?,
            claim_type: ClaimType::from(columns.required(record, 3)?.trim()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ClaimsError;

    const HEADER: &str = "claim_entry_id,member_id_hash,date_of_service,claim_type\n";

    fn parse_table(body: &str) -> ClaimsResult<Vec<ClaimEntry>> {
        let text = format!("{HEADER}{body}");
        crate::TableParser::<_, ClaimEntry>::from_reader(text.as_bytes(), &Default::default())?
            .parse_all()
    }

    #[test]
    fn test_parse_entries() {
        let entries = parse_table("CE1,M1,2023-01-05,medical\nCE2,M1,2023-02-10 00:00:00,pharma\n")
            .unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].claim_entry_id, "CE1");
        assert!(entries[0].claim_type.is_medical());
        assert!(entries[1].claim_type.is_pharmacy());
        assert_eq!(entries[1].date_of_service.to_string(), "2023-02-10");
    }

    #[test]
    fn test_invalid_date_reports_line() {
        let err = parse_table("CE1,M1,2023-01-05,medical\nCE2,M1,05/01/2023,medical\n").unwrap_err();
        match err {
            ClaimsError::Row { table, line, source } => {
                assert_eq!(table, "claims_entries");
                assert_eq!(line, 3);
                assert!(matches!(*source, ClaimsError::InvalidDate { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_blank_member_is_missing_field() {
        let err = parse_table("CE1,,2023-01-05,medical\n").unwrap_err();
        assert!(err.to_string().contains("member_id_hash"));
    }
}
