//! `claims_drugs` table parser.

use csv::StringRecord;
use cohort_types::{well_known, DrugEntry};

use crate::parser::{parse, ColumnIndex, TableRecord};
use crate::types::ClaimsResult;

impl TableRecord for DrugEntry {
    const TABLE: &'static str = well_known::CLAIMS_DRUGS_TABLE;
    const REQUIRED_COLUMNS: &'static [&'static str] =
        &[well_known::CLAIM_ENTRY_ID_COLUMN, well_known::PRODUCT_NAME_COLUMN];

    fn from_record(record: &StringRecord, columns: &ColumnIndex) -> ClaimsResult<Self> {
        Ok(DrugEntry {
            claim_entry_id: parse::text(columns.required(record, 0)?),
            product_service_name: parse::text(columns.value(record, 1)),
        })
    }
}
