//! Claims store abstraction.
//!
//! The engine never touches tables directly. Any store that can answer
//! these queries (an in-memory loader, a test fixture, a database adapter)
//! can drive cohort evaluation.

use std::collections::BTreeSet;

use cohort_types::{Claim, ClaimType, DrugClaim, Member, MemberId, ProcedureClaim};

use crate::CodeFilter;

/// Read-only query surface of a claims store.
///
/// Each method is one query: it returns every matching joined claim across
/// all members. The engine answers per-member questions from the returned
/// rows in memory, so implementations never see per-member query loops.
///
/// The trait is object safe and `Sync` so a single store reference can be
/// shared by cohorts built in parallel.
pub trait ClaimsQueryable: Sync {
    /// Diagnosis claims whose code matches `filter`.
    ///
    /// When `claim_types` is `Some`, only encounters of those types are
    /// returned.
    fn diagnosis_claims(&self, filter: &CodeFilter, claim_types: Option<&[ClaimType]>)
        -> Vec<Claim>;

    /// Procedure claims whose procedure code matches `filter`.
    fn procedure_claims(&self, filter: &CodeFilter) -> Vec<ProcedureClaim>;

    /// Drug claims whose product name matches `filter`.
    fn drug_claims(&self, filter: &CodeFilter) -> Vec<DrugClaim>;

    /// Looks up a member's demographics.
    fn member(&self, member_id: &str) -> Option<&Member>;

    /// Names of the demographic columns, aligned with [`Member::fields`].
    fn demographic_columns(&self) -> &[String];

    /// Members with any diagnosis claim matching `filter`, of any claim type.
    fn members_with_diagnosis(&self, filter: &CodeFilter) -> BTreeSet<MemberId> {
        self.diagnosis_claims(filter, None)
            .into_iter()
            .map(|claim| claim.member_id)
            .collect()
    }
}
