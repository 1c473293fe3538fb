//! Metabolic syndrome strategy.

use cohort_types::Claim;
use tracing::info;

use super::{code_list_conditions, medical_claims};
use crate::error::{BuildError, BuildResult};
use crate::exclusion::ExclusionRule;
use crate::window::{component_window, resolve_pairwise, union_earliest};
use crate::{CohortContext, CohortResolver, IndexDates};

const STRICT_MIN_DAYS: i64 = 30;

/// Condition categories whose members are always excluded.
pub const EXCLUDED_CONDITIONS: &[&str] = &["cushing", "t1dm", "pregnancy", "cancer", "hiv"];

/// Metabolic syndrome: a strict path and a broad component path, unioned.
///
/// - strict: two `medical` claims of the inclusion codes at least 30 days
///   apart, index at the second claim;
/// - broad: `min_components` distinct `components` categories inside one
///   `component_window_days` window of `medical` claims, index at the window
///   start.
///
/// A member on both paths keeps the earlier date. Members with any claim in
/// an [`EXCLUDED_CONDITIONS`] category are dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetabolicSyndromeResolver;

fn missing(key: &str) -> BuildError {
    BuildError::MissingKey {
        key: format!("inclusion.{key}"),
    }
}

impl MetabolicSyndromeResolver {
    fn broad_path(&self, ctx: &CohortContext<'_>) -> BuildResult<IndexDates> {
        let inclusion = ctx.inclusion();
        let components = inclusion.components.as_ref().ok_or_else(|| missing("components"))?;
        let min_components = inclusion.min_components.ok_or_else(|| missing("min_components"))?;
        let window_days = inclusion
            .component_window_days
            .ok_or_else(|| missing("component_window_days"))?;

        let component_claims: Vec<(String, Vec<Claim>)> = components
            .iter()
            .map(|(label, codes)| (label.clone(), medical_claims(ctx, codes)))
            .collect();

        Ok(component_window(&component_claims, min_components, window_days))
    }
}

impl CohortResolver for MetabolicSyndromeResolver {
    fn name(&self) -> &'static str {
        "metabolic_syndrome"
    }

    fn resolve_inclusion(&self, ctx: &CohortContext<'_>) -> BuildResult<Vec<Claim>> {
        Ok(medical_claims(ctx, &ctx.inclusion().icd_codes))
    }

    fn resolve_index_dates(
        &self,
        ctx: &CohortContext<'_>,
        claims: &[Claim],
    ) -> BuildResult<IndexDates> {
        let strict = resolve_pairwise(claims, STRICT_MIN_DAYS);
        let broad = self.broad_path(ctx)?;
        info!(
            cohort = ctx.cohort,
            strict = strict.len(),
            broad = broad.len(),
            "Resolved metabolic syndrome paths"
        );
        Ok(union_earliest(strict, broad))
    }

    fn apply_exclusions(
        &self,
        ctx: &CohortContext<'_>,
        index_dates: IndexDates,
    ) -> BuildResult<IndexDates> {
        let conditions = code_list_conditions(ctx, Some(EXCLUDED_CONDITIONS));
        if conditions.is_empty() {
            return Ok(index_dates);
        }
        Ok(ExclusionRule::ExcludedConditions { conditions }.apply(ctx.store, index_dates))
    }
}
