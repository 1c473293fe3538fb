//! Cohort output records.

use chrono::NaiveDate;

use crate::MemberId;

/// A member's qualification date for one cohort.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IndexDateRecord {
    /// Hashed member identifier.
    pub member_id: MemberId,
    /// Earliest date at which the member satisfied the cohort's criteria.
    pub index_date: NaiveDate,
}

/// One output row: an index-date record joined with member demographics.
///
/// `demographics` is empty-string padded when the member is unknown to the
/// members table (left join semantics).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CohortResult {
    /// Hashed member identifier.
    pub member_id: MemberId,
    /// Qualification date.
    pub index_date: NaiveDate,
    /// Demographic field values, aligned to the result table's columns.
    pub demographics: Vec<String>,
    /// Name of the cohort this row belongs to.
    pub cohort: String,
}

impl CohortResult {
    /// Returns the underlying index-date record.
    pub fn index_record(&self) -> IndexDateRecord {
        IndexDateRecord {
            member_id: self.member_id.clone(),
            index_date: self.index_date,
        }
    }
}
