//! Raw claims-table rows.
//!
//! These mirror one row of each normalized claims table before the store
//! joins code associations onto their encounter entry.

use chrono::NaiveDate;

use crate::{ClaimType, MemberId};

/// A row of the `claims_entries` table: one billed encounter.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClaimEntry {
    /// Encounter identifier, the join key for code associations.
    pub claim_entry_id: String,
    /// Hashed member identifier.
    pub member_id: MemberId,
    /// Date the service was rendered.
    pub date_of_service: NaiveDate,
    /// Claim classification.
    pub claim_type: ClaimType,
}

/// A row of the `claims_diagnoses` table.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DiagnosisEntry {
    /// Encounter this diagnosis belongs to.
    pub claim_entry_id: String,
    /// ICD diagnosis code, in stored casing.
    pub icd_code: String,
}

/// A row of the `claims_procedures` table.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProcedureEntry {
    /// Encounter this procedure belongs to.
    pub claim_entry_id: String,
    /// Procedure (CPT/HCPCS) code.
    pub proc_code: String,
}

/// A row of the `claims_drugs` table.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DrugEntry {
    /// Encounter this drug line belongs to.
    pub claim_entry_id: String,
    /// Dispensed product name. May be empty.
    pub product_service_name: String,
}
