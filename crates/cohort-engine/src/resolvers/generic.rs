//! Generic inclusion/window/exclusion strategy.

use chrono::Months;
use cohort_types::Claim;
use tracing::{debug, warn};

use super::{coded_claims, windowed_exclusions};
use crate::criteria::WindowMode;
use crate::error::{BuildError, BuildResult};
use crate::support::SupportRequirement;
use crate::{window, CodeFilter, CohortContext, CohortResolver, IndexDates, MemberDateIndex};

/// Strategy for cohorts with no condition-specific logic.
///
/// - inclusion: codes and claim types, optionally limited to the last
///   `date_range_years` and corroborated by symptom claims;
/// - index dates: window resolver, `within_months`, support gating;
/// - exclusions: one windowed rule per exclusion key with a window companion.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericResolver;

impl GenericResolver {
    fn restrict_date_range(ctx: &CohortContext<'_>, claims: Vec<Claim>, years: u32) -> Vec<Claim> {
        let Some(start) = ctx
            .config
            .reference_date
            .checked_sub_months(Months::new(years.saturating_mul(12)))
        else {
            return claims;
        };
        let before = claims.len();
        let kept: Vec<Claim> = claims
            .into_iter()
            .filter(|c| c.date_of_service >= start)
            .collect();
        debug!(cohort = ctx.cohort, %start, before, after = kept.len(), "Applied date range");
        kept
    }

    fn corroborate_symptoms(
        ctx: &CohortContext<'_>,
        claims: Vec<Claim>,
        symptom_codes: &[String],
        window_days: i64,
    ) -> Vec<Claim> {
        let symptoms = ctx
            .store
            .diagnosis_claims(&CodeFilter::new(symptom_codes), None);
        let index = MemberDateIndex::from_events(symptoms.iter());
        let before = claims.len();
        let kept: Vec<Claim> = claims
            .into_iter()
            .filter(|c| index.any_within(&c.member_id, c.date_of_service, window_days))
            .collect();
        debug!(cohort = ctx.cohort, before, after = kept.len(), "Applied symptom corroboration");
        kept
    }
}

impl CohortResolver for GenericResolver {
    fn name(&self) -> &'static str {
        "generic"
    }

    fn resolve_inclusion(&self, ctx: &CohortContext<'_>) -> BuildResult<Vec<Claim>> {
        let inclusion = ctx.inclusion();
        let mut claims = coded_claims(ctx);

        if let Some(years) = inclusion.date_range_years {
            claims = Self::restrict_date_range(ctx, claims, years);
        }

        if let (Some(codes), Some(days)) = (&inclusion.symptom_codes, inclusion.symptom_window_days) {
            claims = Self::corroborate_symptoms(ctx, claims, codes, days);
        }

        Ok(claims)
    }

    fn resolve_index_dates(
        &self,
        ctx: &CohortContext<'_>,
        claims: &[Claim],
    ) -> BuildResult<IndexDates> {
        let inclusion = ctx.inclusion();
        let min_claims = inclusion.min_claims.ok_or_else(|| BuildError::MissingKey {
            key: "inclusion.min_claims".to_string(),
        })?;
        let min_days = inclusion.min_days_between_claims.unwrap_or_else(|| {
            warn!(
                cohort = ctx.cohort,
                "'min_days_between_claims' not found in inclusion config; using default 0"
            );
            0
        });
        if inclusion.window_mode == WindowMode::Pairwise && min_claims > 2 {
            warn!(
                cohort = ctx.cohort,
                min_claims,
                "Pairwise window only tests consecutive pairs; set window_mode: n_claim to count every claim"
            );
        }

        let mut index_dates = window::resolve(claims, inclusion.window_mode, min_claims, min_days);

        if let Some(months) = inclusion.within_months {
            index_dates = window::restrict_within_months(index_dates, claims, months, min_claims);
        }

        if let Some(requirement) = SupportRequirement::from_inclusion(inclusion) {
            index_dates = requirement.apply(&ctx.support(), index_dates);
        }

        Ok(index_dates)
    }

    fn apply_exclusions(
        &self,
        ctx: &CohortContext<'_>,
        index_dates: IndexDates,
    ) -> BuildResult<IndexDates> {
        Ok(windowed_exclusions(ctx).apply(ctx.store, index_dates))
    }
}
