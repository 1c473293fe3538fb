//! Joined claim types.
//!
//! A joined claim is an encounter entry combined with one of its code
//! associations. These are the immutable facts the cohort engine reads.

use chrono::NaiveDate;

use crate::{ClaimEntry, ClaimType, DiagnosisEntry, DrugEntry, MemberId, ProcedureEntry};

/// Anything that happened to a member on a date of service.
///
/// Implemented by every joined claim type so windowing and membership
/// indices can be built from any of them.
pub trait ServiceEvent {
    /// The member the event belongs to.
    fn member_id(&self) -> &str;

    /// The date of service.
    fn date_of_service(&self) -> NaiveDate;
}

/// A diagnosis claim: an encounter with one diagnosis code.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use cohort_types::{Claim, ClaimEntry, ClaimType, DiagnosisEntry};
///
/// let entry = ClaimEntry {
///     claim_entry_id: "7".to_string(),
///     member_id: "M1".to_string(),
///     date_of_service: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
///     claim_type: ClaimType::Medical,
/// };
/// let diagnosis = DiagnosisEntry {
///     claim_entry_id: "7".to_string(),
///     icd_code: "I10".to_string(),
/// };
///
/// let claim = Claim::join(&entry, diagnosis);
/// assert_eq!(claim.diagnosis_code, "I10");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Claim {
    /// Encounter identifier.
    pub claim_entry_id: String,
    /// Hashed member identifier.
    pub member_id: MemberId,
    /// Date of service.
    pub date_of_service: NaiveDate,
    /// ICD diagnosis code.
    pub diagnosis_code: String,
    /// Claim classification of the encounter.
    pub claim_type: ClaimType,
}

impl Claim {
    /// Joins a diagnosis row onto its encounter entry.
    pub fn join(entry: &ClaimEntry, diagnosis: DiagnosisEntry) -> Self {
        Self {
            claim_entry_id: diagnosis.claim_entry_id,
            member_id: entry.member_id.clone(),
            date_of_service: entry.date_of_service,
            diagnosis_code: diagnosis.icd_code,
            claim_type: entry.claim_type.clone(),
        }
    }
}

/// A procedure claim: an encounter with one procedure code.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProcedureClaim {
    /// Encounter identifier.
    pub claim_entry_id: String,
    /// Hashed member identifier.
    pub member_id: MemberId,
    /// Date of service.
    pub date_of_service: NaiveDate,
    /// Procedure code.
    pub proc_code: String,
    /// Claim classification of the encounter.
    pub claim_type: ClaimType,
}

impl ProcedureClaim {
    /// Joins a procedure row onto its encounter entry.
    pub fn join(entry: &ClaimEntry, procedure: ProcedureEntry) -> Self {
        Self {
            claim_entry_id: procedure.claim_entry_id,
            member_id: entry.member_id.clone(),
            date_of_service: entry.date_of_service,
            proc_code: procedure.proc_code,
            claim_type: entry.claim_type.clone(),
        }
    }
}

/// A drug claim: an encounter with one dispensed product.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DrugClaim {
    /// Encounter identifier.
    pub claim_entry_id: String,
    /// Hashed member identifier.
    pub member_id: MemberId,
    /// Date of service.
    pub date_of_service: NaiveDate,
    /// Dispensed product name.
    pub product_service_name: String,
    /// Claim classification of the encounter.
    pub claim_type: ClaimType,
}

impl DrugClaim {
    /// Joins a drug row onto its encounter entry.
    pub fn join(entry: &ClaimEntry, drug: DrugEntry) -> Self {
        Self {
            claim_entry_id: drug.claim_entry_id,
            member_id: entry.member_id.clone(),
            date_of_service: entry.date_of_service,
            product_service_name: drug.product_service_name,
            claim_type: entry.claim_type.clone(),
        }
    }

    /// Returns true if the product name is present.
    pub fn has_product_name(&self) -> bool {
        !self.product_service_name.trim().is_empty()
    }
}

macro_rules! impl_service_event {
    ($($ty:ty),*) => {
        $(
            impl ServiceEvent for $ty {
                fn member_id(&self) -> &str {
                    &self.member_id
                }

                fn date_of_service(&self) -> NaiveDate {
                    self.date_of_service
                }
            }
        )*
    };
}

impl_service_event!(Claim, ProcedureClaim, DrugClaim, ClaimEntry);
