//! `claims_procedures` table parser.

use csv::StringRecord;
use cohort_types::{well_known, ProcedureEntry};

use crate::parser::{parse, ColumnIndex, TableRecord};
use crate::types::ClaimsResult;

impl TableRecord for ProcedureEntry {
    const TABLE: &'static str = well_known::CLAIMS_PROCEDURES_TABLE;
    const REQUIRED_COLUMNS: &'static [&'static str] =
        &[well_known::CLAIM_ENTRY_ID_COLUMN, well_known::PROC_CODE_COLUMN];

    fn from_record(record: &StringRecord, columns: &ColumnIndex) -> ClaimsResult<Self> {
        Ok(ProcedureEntry {
            claim_entry_id: parse::text(columns.required(record, 0)?),
            proc_code: parse::text(columns.value(record, 1)),
        })
    }
}
