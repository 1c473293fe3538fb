//! Built-in cohort strategies.
//!
//! | strategy | cohorts | logic key |
//! |---|---|---|
//! | [`GenericResolver`] | fallback | `generic` |
//! | [`MetabolicSyndromeResolver`] | `Metabolic_Syndrome` | `metabolic_syndrome` |
//! | [`PcosResolver`] | `PCOS` | `pcos` |
//! | [`DiabetesResolver`] | diabetes subtypes | `diabetes` |
//! | [`CardiometabolicResolver`] | `HTN_*`, `Dyslipidemia_*`, `CAD_CHD_*` | `cardiometabolic` |

mod cardiometabolic;
mod diabetes;
mod generic;
mod metabolic;
mod pcos;

pub use cardiometabolic::CardiometabolicResolver;
pub use diabetes::{DiabetesResolver, DiabetesSubtype, ExclusionShape};
pub use generic::GenericResolver;
pub use metabolic::{MetabolicSyndromeResolver, EXCLUDED_CONDITIONS};
pub use pcos::PcosResolver;

use cohort_types::{Claim, ClaimType};
use tracing::warn;

use crate::criteria::{ExclusionSpec, ExclusionValue};
use crate::exclusion::{ExclusionCascade, ExclusionRule};
use crate::{CodeFilter, CohortContext};

/// Inclusion claims matching the cohort's codes and claim types.
pub(crate) fn coded_claims(ctx: &CohortContext<'_>) -> Vec<Claim> {
    let inclusion = ctx.inclusion();
    let filter = CodeFilter::new(&inclusion.icd_codes);
    let claim_types = inclusion.claim_types();
    ctx.store.diagnosis_claims(&filter, claim_types.as_deref())
}

/// `medical` claims matching `codes`, regardless of configured claim types.
pub(crate) fn medical_claims(ctx: &CohortContext<'_>, codes: &[String]) -> Vec<Claim> {
    let medical = [ClaimType::Medical];
    ctx.store
        .diagnosis_claims(&CodeFilter::new(codes), Some(medical.as_slice()))
}

/// Companion window key of an exclusion key: `organic_gi` has
/// `organic_gi_window_days`, `subtypes` has `subtype_window_days`.
fn window_days_for(exclusion: &ExclusionSpec, key: &str) -> Option<i64> {
    exclusion.days(&format!("{key}_window_days")).or_else(|| {
        key.strip_suffix('s')
            .and_then(|singular| exclusion.days(&format!("{singular}_window_days")))
    })
}

/// One `WithinWindow` rule per code-list key with a companion window.
pub(crate) fn windowed_exclusions(ctx: &CohortContext<'_>) -> ExclusionCascade {
    let exclusion = ctx.exclusion();
    let mut cascade = ExclusionCascade::new();

    for (key, value) in exclusion.iter() {
        match value {
            ExclusionValue::Codes(codes) => match window_days_for(exclusion, key) {
                Some(window_days) => cascade.push(ExclusionRule::WithinWindow {
                    key: key.to_string(),
                    codes: codes.clone(),
                    window_days,
                }),
                None => warn!(
                    cohort = ctx.cohort,
                    key,
                    "Exclusion key has no window companion; ignored"
                ),
            },
            ExclusionValue::Days(_) => {}
        }
    }
    cascade
}

/// Every code-list key as an excluded condition, in file order.
pub(crate) fn code_list_conditions(
    ctx: &CohortContext<'_>,
    keys: Option<&[&str]>,
) -> Vec<(String, Vec<String>)> {
    let mut conditions = Vec::new();
    for (key, value) in ctx.exclusion().iter() {
        if let Some(allowed) = keys {
            if !allowed.contains(&key) {
                warn!(cohort = ctx.cohort, key, "Exclusion key not used by this cohort; ignored");
                continue;
            }
        }
        match value {
            ExclusionValue::Codes(codes) => conditions.push((key.to_string(), codes.clone())),
            ExclusionValue::Days(_) => {
                warn!(cohort = ctx.cohort, key, "Exclusion key is not a code list; ignored")
            }
        }
    }
    conditions
}
