//! Hypertension, dyslipidemia and CAD/CHD strategy.

use cohort_types::Claim;

use super::{coded_claims, windowed_exclusions};
use crate::error::BuildResult;
use crate::support::SupportRequirement;
use crate::{window, CohortContext, CohortResolver, IndexDates};

const DEFAULT_MIN_CLAIMS: usize = 2;
const DEFAULT_MIN_DAYS: i64 = 30;

/// Cardiometabolic cohorts.
///
/// `min_claims: 1` is the sensitive definition (first claim per member);
/// anything higher is the conservative one (window resolver, 30-day default
/// gap). Either way support gating follows.
#[derive(Debug, Clone, Copy, Default)]
pub struct CardiometabolicResolver;

impl CohortResolver for CardiometabolicResolver {
    fn name(&self) -> &'static str {
        "cardiometabolic"
    }

    fn resolve_inclusion(&self, ctx: &CohortContext<'_>) -> BuildResult<Vec<Claim>> {
        Ok(coded_claims(ctx))
    }

    fn resolve_index_dates(
        &self,
        ctx: &CohortContext<'_>,
        claims: &[Claim],
    ) -> BuildResult<IndexDates> {
        let inclusion = ctx.inclusion();
        let min_claims = inclusion.min_claims.unwrap_or(DEFAULT_MIN_CLAIMS);
        let min_days = inclusion.min_days_between_claims.unwrap_or(DEFAULT_MIN_DAYS);

        let index_dates = if min_claims == 1 {
            window::first_claim_dates(claims)
        } else {
            window::resolve(claims, inclusion.window_mode, min_claims, min_days)
        };

        Ok(match SupportRequirement::from_inclusion(inclusion) {
            Some(requirement) => requirement.apply(&ctx.support(), index_dates),
            None => index_dates,
        })
    }

    fn apply_exclusions(
        &self,
        ctx: &CohortContext<'_>,
        index_dates: IndexDates,
    ) -> BuildResult<IndexDates> {
        Ok(windowed_exclusions(ctx).apply(ctx.store, index_dates))
    }
}
