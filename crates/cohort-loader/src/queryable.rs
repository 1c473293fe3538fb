//! [`ClaimsQueryable`] over the in-memory store.

use cohort_engine::{ClaimsQueryable, CodeFilter};
use cohort_types::{Claim, ClaimType, DrugClaim, Member, ProcedureClaim};
use std::collections::HashMap;

use crate::store::ClaimsStore;

/// Positions matching `filter`, in load order.
///
/// Exact-code filters are answered from the code index; any wildcard or
/// prefix pattern scans.
fn matching_positions<'a, F>(
    filter: &CodeFilter,
    by_code: &HashMap<String, Vec<usize>>,
    len: usize,
    code_at: F,
) -> Vec<usize>
where
    F: Fn(usize) -> &'a str,
{
    if filter.is_empty() {
        return Vec::new();
    }
    match filter.exact_codes() {
        Some(codes) => {
            let mut positions: Vec<usize> = codes
                .iter()
                .filter_map(|code| by_code.get(*code))
                .flatten()
                .copied()
                .collect();
            positions.sort_unstable();
            positions.dedup();
            positions
        }
        None => (0..len).filter(|&i| filter.matches(code_at(i))).collect(),
    }
}

impl ClaimsQueryable for ClaimsStore {
    fn diagnosis_claims(&self, filter: &CodeFilter, claim_types: Option<&[ClaimType]>) -> Vec<Claim> {
        matching_positions(filter, &self.diagnoses_by_code, self.diagnoses.len(), |i| {
            self.diagnoses[i].diagnosis_code.as_str()
        })
        .into_iter()
        .map(|i| &self.diagnoses[i])
        .filter(|c| claim_types.map_or(true, |types| types.contains(&c.claim_type)))
        .cloned()
        .collect()
    }

    fn procedure_claims(&self, filter: &CodeFilter) -> Vec<ProcedureClaim> {
        matching_positions(filter, &self.procedures_by_code, self.procedures.len(), |i| {
            self.procedures[i].proc_code.as_str()
        })
        .into_iter()
        .map(|i| self.procedures[i].clone())
        .collect()
    }

    fn drug_claims(&self, filter: &CodeFilter) -> Vec<DrugClaim> {
        self.drugs
            .iter()
            .filter(|c| filter.matches(&c.product_service_name))
            .cloned()
            .collect()
    }

    fn member(&self, member_id: &str) -> Option<&Member> {
        self.members.get(member_id)
    }

    fn demographic_columns(&self) -> &[String] {
        &self.demographic_columns
    }
}
