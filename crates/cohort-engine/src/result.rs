//! Assembled cohort tables.

use chrono::NaiveDate;
use cohort_types::{well_known, CohortResult};
use indexmap::IndexMap;

use crate::IndexDates;

/// One cohort's assembled rows.
///
/// Rows are ordered by member id. `columns` names the demographic fields
/// carried by every row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CohortTable {
    /// Cohort name.
    pub cohort: String,
    /// Demographic column names.
    pub columns: Vec<String>,
    /// Output rows.
    pub rows: Vec<CohortResult>,
}

impl CohortTable {
    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the cohort has no members.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Full output header: `member_id`, `index_date`, demographics, `cohort`.
    pub fn header(&self) -> Vec<String> {
        output_header(&self.columns)
    }

    /// The table's index dates.
    pub fn index_dates(&self) -> IndexDates {
        self.rows
            .iter()
            .map(|row| (row.member_id.clone(), row.index_date))
            .collect()
    }
}

fn output_header(columns: &[String]) -> Vec<String> {
    let mut header = Vec::with_capacity(columns.len() + 3);
    header.push(well_known::OUTPUT_MEMBER_ID_COLUMN.to_string());
    header.push(well_known::OUTPUT_INDEX_DATE_COLUMN.to_string());
    header.extend(columns.iter().cloned());
    header.push(well_known::OUTPUT_COHORT_COLUMN.to_string());
    header
}

/// Union of several cohort tables.
///
/// A member qualifying for several cohorts appears once per cohort.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CombinedCohorts {
    /// Demographic column names shared by all rows.
    pub columns: Vec<String>,
    /// Rows of every cohort, in build order.
    pub rows: Vec<CohortResult>,
    /// Every cohort built, including empty ones, in build order.
    pub cohorts: Vec<String>,
    /// Row count per cohort.
    pub cohort_counts: IndexMap<String, usize>,
}

impl CombinedCohorts {
    /// Unions built tables.
    pub fn from_tables<I>(tables: I) -> Self
    where
        I: IntoIterator<Item = CohortTable>,
    {
        let mut combined = Self::default();
        for table in tables {
            if combined.cohorts.is_empty() {
                combined.columns = table.columns.clone();
            }
            combined.cohorts.push(table.cohort.clone());
            combined.cohort_counts.insert(table.cohort, table.rows.len());
            combined.rows.extend(table.rows);
        }
        combined
    }

    /// Full output header.
    pub fn header(&self) -> Vec<String> {
        output_header(&self.columns)
    }

    /// Number of rows across all cohorts.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if no cohort produced rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of combined rows. A member in several cohorts counts once
    /// per cohort.
    pub fn total_patients(&self) -> usize {
        self.rows.len()
    }

    /// Number of distinct members across all cohorts.
    pub fn distinct_members(&self) -> usize {
        let mut members: Vec<&str> = self.rows.iter().map(|r| r.member_id.as_str()).collect();
        members.sort_unstable();
        members.dedup();
        members.len()
    }

    /// Earliest and latest index date across all rows.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let earliest = self.rows.iter().map(|r| r.index_date).min()?;
        let latest = self.rows.iter().map(|r| r.index_date).max()?;
        Some((earliest, latest))
    }
}
