//! Procedure and medication support.
//!
//! Support is a secondary signal corroborating a diagnosis-based inclusion:
//! a matching procedure claim, or a matching pharmacy claim. Batch variants
//! run one store query for all requested members and answer from memory.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use cohort_types::MemberId;
use tracing::{debug, info};

use crate::criteria::InclusionSpec;
use crate::{ClaimsQueryable, CodeFilter, IndexDates, MemberDateIndex};

/// Answers support questions against a claims store.
pub struct SupportEvaluator<'a> {
    store: &'a dyn ClaimsQueryable,
    non_procedure_code: &'a str,
}

impl<'a> SupportEvaluator<'a> {
    /// Creates an evaluator. `non_procedure_code` never counts as support.
    pub fn new(store: &'a dyn ClaimsQueryable, non_procedure_code: &'a str) -> Self {
        Self {
            store,
            non_procedure_code,
        }
    }

    /// One query: dates of matching procedure claims per member.
    pub fn procedure_index(&self, codes: &[String]) -> MemberDateIndex {
        let filter = CodeFilter::new(codes);
        if filter.is_empty() {
            return MemberDateIndex::new();
        }
        let claims = self.store.procedure_claims(&filter);
        MemberDateIndex::from_events(
            claims
                .iter()
                .filter(|c| c.proc_code != self.non_procedure_code),
        )
    }

    /// One query: dates of matching pharmacy claims per member.
    pub fn drug_index(&self, names: &[String]) -> MemberDateIndex {
        let filter = CodeFilter::product_names(names);
        if filter.is_empty() {
            return MemberDateIndex::new();
        }
        let claims = self.store.drug_claims(&filter);
        MemberDateIndex::from_events(
            claims
                .iter()
                .filter(|c| c.claim_type.is_pharmacy() && c.has_product_name()),
        )
    }

    /// Whether the member has any matching procedure claim.
    pub fn procedure_support(&self, member: &str, codes: &[String]) -> bool {
        !codes.is_empty() && self.procedure_index(codes).contains(member)
    }

    /// Whether the member has a matching procedure claim in
    /// `[reference - window_days, reference]`.
    pub fn procedure_support_within(
        &self,
        member: &str,
        codes: &[String],
        reference: NaiveDate,
        window_days: i64,
    ) -> bool {
        !codes.is_empty()
            && self
                .procedure_index(codes)
                .any_trailing(member, reference, window_days)
    }

    /// Whether the member has any matching pharmacy claim.
    pub fn drug_support(&self, member: &str, names: &[String]) -> bool {
        !names.is_empty() && self.drug_index(names).contains(member)
    }

    /// Whether the member has a matching pharmacy claim in
    /// `[reference - window_days, reference]`.
    pub fn drug_support_within(
        &self,
        member: &str,
        names: &[String],
        reference: NaiveDate,
        window_days: i64,
    ) -> bool {
        !names.is_empty()
            && self
                .drug_index(names)
                .any_trailing(member, reference, window_days)
    }

    /// Procedure support for every requested member.
    pub fn batch_procedure_support<'m, I>(&self, members: I, codes: &[String]) -> BTreeMap<MemberId, bool>
    where
        I: IntoIterator<Item = &'m str>,
    {
        let index = self.procedure_index(codes);
        batch(members, |m| index.contains(m))
    }

    /// Windowed procedure support, each member against its own reference date.
    pub fn batch_procedure_support_within(
        &self,
        references: &IndexDates,
        codes: &[String],
        window_days: i64,
    ) -> BTreeMap<MemberId, bool> {
        let index = self.procedure_index(codes);
        batch_within(references, |m, date| index.any_trailing(m, date, window_days))
    }

    /// Medication support for every requested member.
    pub fn batch_drug_support<'m, I>(&self, members: I, names: &[String]) -> BTreeMap<MemberId, bool>
    where
        I: IntoIterator<Item = &'m str>,
    {
        let index = self.drug_index(names);
        batch(members, |m| index.contains(m))
    }

    /// Windowed medication support, each member against its own reference date.
    pub fn batch_drug_support_within(
        &self,
        references: &IndexDates,
        names: &[String],
        window_days: i64,
    ) -> BTreeMap<MemberId, bool> {
        let index = self.drug_index(names);
        batch_within(references, |m, date| index.any_trailing(m, date, window_days))
    }
}

fn batch<'m, I, F>(members: I, supported: F) -> BTreeMap<MemberId, bool>
where
    I: IntoIterator<Item = &'m str>,
    F: Fn(&str) -> bool,
{
    members
        .into_iter()
        .map(|m| (m.to_string(), supported(m)))
        .collect()
}

fn batch_within<F>(references: &IndexDates, supported: F) -> BTreeMap<MemberId, bool>
where
    F: Fn(&str, NaiveDate) -> bool,
{
    references
        .iter()
        .map(|(m, date)| (m.clone(), supported(m, *date)))
        .collect()
}

fn supported_set(flags: BTreeMap<MemberId, bool>) -> BTreeSet<MemberId> {
    flags
        .into_iter()
        .filter_map(|(m, ok)| ok.then_some(m))
        .collect()
}

/// Support gating of one cohort.
///
/// With both checks configured, `require_both` selects AND (procedure filter
/// first, then medication narrows) or OR (union of both supported sets).
/// A single configured check applies on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupportRequirement {
    /// Procedure support codes, when enabled.
    pub procedure_codes: Option<Vec<String>>,
    /// Medication support names, when enabled.
    pub medication_codes: Option<Vec<String>>,
    /// AND (true) or OR (false) combination.
    pub require_both: bool,
    /// Trailing window ending at the index date; `None` means any time.
    pub window_days: Option<i64>,
}

impl SupportRequirement {
    /// Reads the support keys of an inclusion section.
    ///
    /// Returns `None` when neither check is enabled.
    pub fn from_inclusion(inclusion: &InclusionSpec) -> Option<Self> {
        let procedure_codes = inclusion.procedure_support_codes().map(<[String]>::to_vec);
        let medication_codes = inclusion.medication_support_codes().map(<[String]>::to_vec);
        if procedure_codes.is_none() && medication_codes.is_none() {
            return None;
        }
        Some(Self {
            procedure_codes,
            medication_codes,
            require_both: inclusion.require_both_procedure_and_medication,
            window_days: inclusion.support_window_days,
        })
    }

    fn procedure_supported(
        &self,
        evaluator: &SupportEvaluator<'_>,
        index_dates: &IndexDates,
        codes: &[String],
    ) -> BTreeSet<MemberId> {
        let flags = match self.window_days {
            Some(days) => evaluator.batch_procedure_support_within(index_dates, codes, days),
            None => evaluator.batch_procedure_support(index_dates.keys().map(String::as_str), codes),
        };
        supported_set(flags)
    }

    fn drug_supported(
        &self,
        evaluator: &SupportEvaluator<'_>,
        index_dates: &IndexDates,
        names: &[String],
    ) -> BTreeSet<MemberId> {
        let flags = match self.window_days {
            Some(days) => evaluator.batch_drug_support_within(index_dates, names, days),
            None => evaluator.batch_drug_support(index_dates.keys().map(String::as_str), names),
        };
        supported_set(flags)
    }

    /// Keeps only supported members.
    pub fn apply(&self, evaluator: &SupportEvaluator<'_>, index_dates: IndexDates) -> IndexDates {
        if index_dates.is_empty() {
            return index_dates;
        }
        let before = index_dates.len();

        let kept = match (&self.procedure_codes, &self.medication_codes) {
            (Some(codes), Some(names)) if self.require_both => {
                let procedure = self.procedure_supported(evaluator, &index_dates, codes);
                let narrowed = retain(index_dates, &procedure);
                info!(members = narrowed.len(), "Filtered to members with procedure support");
                let drug = self.drug_supported(evaluator, &narrowed, names);
                let narrowed = retain(narrowed, &drug);
                info!(members = narrowed.len(), "Filtered to members with drug support");
                narrowed
            }
            (Some(codes), Some(names)) => {
                let procedure = self.procedure_supported(evaluator, &index_dates, codes);
                let drug = self.drug_supported(evaluator, &index_dates, names);
                let combined: BTreeSet<MemberId> = procedure.union(&drug).cloned().collect();
                info!(
                    procedure = procedure.len(),
                    drug = drug.len(),
                    combined = combined.len(),
                    "Combined procedure OR drug support"
                );
                retain(index_dates, &combined)
            }
            (Some(codes), None) => {
                let procedure = self.procedure_supported(evaluator, &index_dates, codes);
                retain(index_dates, &procedure)
            }
            (None, Some(names)) => {
                let drug = self.drug_supported(evaluator, &index_dates, names);
                retain(index_dates, &drug)
            }
            (None, None) => index_dates,
        };

        debug!(before, after = kept.len(), "Applied support gating");
        kept
    }
}

fn retain(mut index_dates: IndexDates, members: &BTreeSet<MemberId>) -> IndexDates {
    index_dates.retain(|m, _| members.contains(m));
    index_dates
}
