//! Polycystic ovary syndrome strategy.

use cohort_types::Claim;

use super::{code_list_conditions, medical_claims};
use crate::error::BuildResult;
use crate::exclusion::ExclusionRule;
use crate::window::{dates_by_member, first_qualifying_pair};
use crate::{CohortContext, CohortResolver, IndexDates};

const DEFAULT_MIN_CLAIMS: usize = 2;
const DEFAULT_MIN_DAYS: i64 = 30;

/// PCOS: `medical` claims, at least `min_claims` of them, first consecutive
/// pair `min_days_between_claims` apart. Every code-list exclusion key is an
/// excluded condition.
#[derive(Debug, Clone, Copy, Default)]
pub struct PcosResolver;

impl CohortResolver for PcosResolver {
    fn name(&self) -> &'static str {
        "pcos"
    }

    fn resolve_inclusion(&self, ctx: &CohortContext<'_>) -> BuildResult<Vec<Claim>> {
        Ok(medical_claims(ctx, &ctx.inclusion().icd_codes))
    }

    fn resolve_index_dates(
        &self,
        ctx: &CohortContext<'_>,
        claims: &[Claim],
    ) -> BuildResult<IndexDates> {
        let inclusion = ctx.inclusion();
        let min_claims = inclusion.min_claims.unwrap_or(DEFAULT_MIN_CLAIMS);
        let min_days = inclusion.min_days_between_claims.unwrap_or(DEFAULT_MIN_DAYS);

        Ok(dates_by_member(claims)
            .into_iter()
            .filter(|(_, dates)| dates.len() >= min_claims)
            .filter_map(|(member, dates)| {
                first_qualifying_pair(&dates, min_days).map(|date| (member, date))
            })
            .collect())
    }

    fn apply_exclusions(
        &self,
        ctx: &CohortContext<'_>,
        index_dates: IndexDates,
    ) -> BuildResult<IndexDates> {
        let conditions = code_list_conditions(ctx, None);
        if conditions.is_empty() {
            return Ok(index_dates);
        }
        Ok(ExclusionRule::ExcludedConditions { conditions }.apply(ctx.store, index_dates))
    }
}
