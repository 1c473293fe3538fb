//! Diabetes subtype strategy.
//!
//! All subtypes share inclusion and index-date logic; the exclusion rules
//! that apply differ per subtype and are listed in
//! [`DiabetesSubtype::exclusion_catalogue`].

use cohort_types::{well_known, Claim};
use tracing::debug;

use super::coded_claims;
use crate::error::{BuildError, BuildResult};
use crate::exclusion::{ExclusionCascade, ExclusionRule, LookbackRule};
use crate::window::{self, resolve_pairwise};
use crate::{CohortContext, CohortResolver, IndexDates};

const DEFAULT_MIN_CLAIMS: usize = 2;
const DEFAULT_MIN_DAYS: i64 = 30;
const PRE_DIABETES_MIN_DAYS: i64 = 30;
const LOOKBACK_KEY: &str = "lookback_no_diabetes";

/// Diabetes subtype, derived from the cohort name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiabetesSubtype {
    /// `Diabetes_NoComp`.
    NoComplications,
    /// `Diabetes_HTN`.
    Hypertension,
    /// `Diabetes_Kidney`.
    Kidney,
    /// `PreDiabetes`.
    PreDiabetes,
    /// `GDM`.
    Gestational,
    /// A cohort routed here by `logic: diabetes` under another name.
    Other,
}

/// How an exclusion key is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExclusionShape {
    /// Matching claim at any time.
    Presence,
    /// Matching claim on or before the index date.
    OnOrBeforeIndex,
}

use ExclusionShape::{OnOrBeforeIndex, Presence};

impl DiabetesSubtype {
    /// Maps a cohort name to its subtype.
    pub fn from_cohort(name: &str) -> Self {
        match name {
            well_known::DIABETES_NO_COMP => Self::NoComplications,
            well_known::DIABETES_HTN => Self::Hypertension,
            well_known::DIABETES_KIDNEY => Self::Kidney,
            well_known::PRE_DIABETES => Self::PreDiabetes,
            well_known::GDM => Self::Gestational,
            _ => Self::Other,
        }
    }

    /// Whether candidate claims need a "no prior diabetes" lookback.
    pub fn uses_lookback(self) -> bool {
        matches!(self, Self::PreDiabetes | Self::Gestational)
    }

    /// Exclusion keys honoured for this subtype, in application order.
    pub fn exclusion_catalogue(self) -> &'static [(&'static str, ExclusionShape)] {
        match self {
            Self::PreDiabetes => &[("diabetes_codes", OnOrBeforeIndex), ("gdm_codes", Presence)],
            Self::NoComplications => &[
                ("gdm_codes", Presence),
                ("esrd_codes", Presence),
                ("ckd5_codes", Presence),
                ("htn_codes", Presence),
            ],
            Self::Hypertension => &[
                ("gdm_codes", Presence),
                ("esrd_codes", Presence),
                ("ckd5_codes", Presence),
            ],
            Self::Kidney => &[("gdm_codes", Presence), ("ckd_stages_1_4", Presence)],
            Self::Gestational => &[
                ("gdm_codes", Presence),
                ("pre_existing_diabetes", Presence),
                ("o9981_code", Presence),
            ],
            Self::Other => &[("gdm_codes", Presence)],
        }
    }
}

/// Diabetes subtypes: `Diabetes_NoComp`, `Diabetes_HTN`, `Diabetes_Kidney`,
/// `PreDiabetes` and `GDM`.
///
/// PreDiabetes and GDM drop candidate claims preceded by a diabetes claim
/// (the `Diabetes_NoComp` inclusion codes) within `lookback_no_diabetes`
/// months.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiabetesResolver;

impl DiabetesResolver {
    fn lookback_rule(ctx: &CohortContext<'_>, months: u32) -> BuildResult<LookbackRule> {
        let reference = ctx
            .criteria
            .cohort(well_known::DIABETES_NO_COMP)
            .ok_or_else(|| BuildError::MissingReference {
                cohort: well_known::DIABETES_NO_COMP.to_string(),
                key: LOOKBACK_KEY.to_string(),
            })?;
        Ok(LookbackRule {
            key: LOOKBACK_KEY.to_string(),
            codes: reference.inclusion.icd_codes.clone(),
            months,
        })
    }

    /// Builds the exclusion cascade configured for the cohort.
    pub fn cascade(ctx: &CohortContext<'_>) -> ExclusionCascade {
        let subtype = DiabetesSubtype::from_cohort(ctx.cohort);
        let exclusion = ctx.exclusion();
        let catalogue = subtype.exclusion_catalogue();

        for (key, _) in exclusion.iter() {
            if !catalogue.iter().any(|(k, _)| *k == key) {
                debug!(cohort = ctx.cohort, key, "Exclusion key not applicable to subtype");
            }
        }

        let mut cascade = ExclusionCascade::new();
        for (key, shape) in catalogue {
            let Some(codes) = exclusion.codes(key) else {
                continue;
            };
            let key = key.to_string();
            let codes = codes.to_vec();
            cascade.push(match *shape {
                Presence => ExclusionRule::Presence { key, codes },
                OnOrBeforeIndex => ExclusionRule::OnOrBeforeIndex { key, codes },
            });
        }
        cascade
    }
}

impl CohortResolver for DiabetesResolver {
    fn name(&self) -> &'static str {
        "diabetes"
    }

    fn resolve_inclusion(&self, ctx: &CohortContext<'_>) -> BuildResult<Vec<Claim>> {
        let claims = coded_claims(ctx);
        let subtype = DiabetesSubtype::from_cohort(ctx.cohort);

        match ctx.inclusion().lookback_no_diabetes {
            Some(months) if subtype.uses_lookback() => {
                let rule = Self::lookback_rule(ctx, months)?;
                Ok(rule.apply(ctx.store, claims))
            }
            _ => Ok(claims),
        }
    }

    fn resolve_index_dates(
        &self,
        ctx: &CohortContext<'_>,
        claims: &[Claim],
    ) -> BuildResult<IndexDates> {
        if DiabetesSubtype::from_cohort(ctx.cohort) == DiabetesSubtype::PreDiabetes {
            return Ok(resolve_pairwise(claims, PRE_DIABETES_MIN_DAYS));
        }

        let inclusion = ctx.inclusion();
        let min_claims = inclusion.min_claims.unwrap_or(DEFAULT_MIN_CLAIMS);
        let min_days = inclusion.min_days_between_claims.unwrap_or(DEFAULT_MIN_DAYS);
        Ok(window::resolve(claims, inclusion.window_mode, min_claims, min_days))
    }

    fn apply_exclusions(
        &self,
        ctx: &CohortContext<'_>,
        index_dates: IndexDates,
    ) -> BuildResult<IndexDates> {
        Ok(Self::cascade(ctx).apply(ctx.store, index_dates))
    }
}
