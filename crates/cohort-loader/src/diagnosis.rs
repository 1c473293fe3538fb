//! `claims_diagnoses` table parser.

use csv::StringRecord;
use cohort_types::{well_known, DiagnosisEntry};

use crate::parser::{parse, ColumnIndex, TableRecord};
use crate::types::ClaimsResult;

impl TableRecord for DiagnosisEntry {
    const TABLE: &'static str = well_known::CLAIMS_DIAGNOSES_TABLE;
    const REQUIRED_COLUMNS: &'static [&'static str] =
        &[well_known::CLAIM_ENTRY_ID_COLUMN, well_known::ICD_CODE_COLUMN];

    fn from_record(record: &StringRecord, columns: &ColumnIndex) -> ClaimsResult<Self> {
        Ok(DiagnosisEntry {
            claim_entry_id: parse::text(columns.required(record, 0)?),
            icd_code: parse::text(columns.value(record, 1)),
        })
    }
}
