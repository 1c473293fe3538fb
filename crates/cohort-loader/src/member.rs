//! `members` table parser.
//!
//! Every column other than the member key is a demographic field, kept in
//! file order.

use csv::StringRecord;
use cohort_types::{well_known, Member};

use crate::parser::{parse, ColumnIndex, TableRecord};
use crate::types::ClaimsResult;

impl TableRecord for Member {
    const TABLE: &'static str = well_known::MEMBERS_TABLE;
    const REQUIRED_COLUMNS: &'static [&'static str] = &[well_known::MEMBER_ID_COLUMN];

    fn from_record(record: &StringRecord, columns: &ColumnIndex) -> ClaimsResult<Self> {
        let member_id = parse::text(columns.required(record, 0)?);
        let fields = columns
            .other_columns()
            .map(|(pos, _)| parse::text(record.get(pos).unwrap_or("")))
            .collect();
        Ok(Member::new(member_id, fields))
    }
}

/// Demographic column names of a members table header.
pub fn demographic_columns(columns: &ColumnIndex) -> Vec<String> {
    columns
        .other_columns()
        .map(|(_, name)| name.to_string())
        .collect()
}
