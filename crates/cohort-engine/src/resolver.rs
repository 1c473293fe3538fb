//! Cohort strategies and their registry.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use cohort_types::{well_known, Claim};
use tracing::debug;

use crate::criteria::{CohortSpec, CriteriaConfig, ExclusionSpec, InclusionSpec};
use crate::error::{BuildError, BuildResult};
use crate::resolvers::{
    CardiometabolicResolver, DiabetesResolver, GenericResolver, MetabolicSyndromeResolver,
    PcosResolver,
};
use crate::support::SupportEvaluator;
use crate::{ClaimsQueryable, EngineConfig, IndexDates};

/// Everything a strategy may read while building one cohort.
#[derive(Clone, Copy)]
pub struct CohortContext<'a> {
    /// Name of the cohort being built.
    pub cohort: &'a str,
    /// The cohort's criteria.
    pub spec: &'a CohortSpec,
    /// The whole criteria document, for cross-cohort references.
    pub criteria: &'a CriteriaConfig,
    /// The claims store.
    pub store: &'a dyn ClaimsQueryable,
    /// Engine configuration.
    pub config: &'a EngineConfig,
}

impl<'a> CohortContext<'a> {
    /// The cohort's inclusion section.
    pub fn inclusion(&self) -> &'a InclusionSpec {
        &self.spec.inclusion
    }

    /// The cohort's exclusion section.
    pub fn exclusion(&self) -> &'a ExclusionSpec {
        &self.spec.exclusion
    }

    /// A support evaluator over this context's store.
    pub fn support(&self) -> SupportEvaluator<'a> {
        SupportEvaluator::new(self.store, &self.config.non_procedure_code)
    }
}

impl fmt::Debug for CohortContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CohortContext")
            .field("cohort", &self.cohort)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// A named cohort-building strategy.
///
/// The default [`resolve`](CohortResolver::resolve) runs the three stages in
/// order: inclusion claims, index dates, exclusions.
pub trait CohortResolver: Send + Sync {
    /// Strategy name, used in logs.
    fn name(&self) -> &'static str;

    /// Selects the claims that can qualify a member.
    fn resolve_inclusion(&self, ctx: &CohortContext<'_>) -> BuildResult<Vec<Claim>>;

    /// Resolves one index date per qualifying member.
    fn resolve_index_dates(
        &self,
        ctx: &CohortContext<'_>,
        claims: &[Claim],
    ) -> BuildResult<IndexDates>;

    /// Removes excluded members.
    fn apply_exclusions(
        &self,
        ctx: &CohortContext<'_>,
        index_dates: IndexDates,
    ) -> BuildResult<IndexDates>;

    /// Runs the full strategy.
    fn resolve(&self, ctx: &CohortContext<'_>) -> BuildResult<IndexDates> {
        let claims = self.resolve_inclusion(ctx)?;
        debug!(cohort = ctx.cohort, claims = claims.len(), "Resolved inclusion claims");

        let index_dates = self.resolve_index_dates(ctx, &claims)?;
        debug!(cohort = ctx.cohort, members = index_dates.len(), "Resolved index dates");

        let index_dates = self.apply_exclusions(ctx, index_dates)?;
        debug!(cohort = ctx.cohort, members = index_dates.len(), "Applied exclusions");
        Ok(index_dates)
    }
}

/// Dispatch table from cohort identity to strategy.
///
/// Lookup order: the cohort's `logic` key, then an exact cohort-name
/// registration, then the longest registered name prefix, then the fallback
/// strategy. An unregistered `logic` key is an error.
///
/// # Example
///
/// ```rust
/// use cohort_engine::CohortRegistry;
///
/// let registry = CohortRegistry::with_defaults();
/// assert_eq!(registry.strategy_for("PCOS", None).unwrap().name(), "pcos");
/// assert_eq!(registry.strategy_for("HTN_Sensitive", None).unwrap().name(), "cardiometabolic");
/// assert_eq!(registry.strategy_for("IBS", None).unwrap().name(), "generic");
/// assert!(registry.strategy_for("IBS", Some("unknown")).is_err());
/// ```
#[derive(Clone)]
pub struct CohortRegistry {
    by_name: HashMap<String, Arc<dyn CohortResolver>>,
    by_prefix: Vec<(String, Arc<dyn CohortResolver>)>,
    by_logic: HashMap<String, Arc<dyn CohortResolver>>,
    fallback: Arc<dyn CohortResolver>,
}

impl Default for CohortRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl CohortRegistry {
    /// A registry with only the generic fallback.
    pub fn new() -> Self {
        Self::with_fallback(Arc::new(GenericResolver))
    }

    /// A registry with only the given fallback.
    pub fn with_fallback(fallback: Arc<dyn CohortResolver>) -> Self {
        Self {
            by_name: HashMap::new(),
            by_prefix: Vec::new(),
            by_logic: HashMap::new(),
            fallback,
        }
    }

    /// A registry with every built-in condition strategy.
    pub fn with_defaults() -> Self {
        let generic: Arc<dyn CohortResolver> = Arc::new(GenericResolver);
        let metabolic: Arc<dyn CohortResolver> = Arc::new(MetabolicSyndromeResolver);
        let pcos: Arc<dyn CohortResolver> = Arc::new(PcosResolver);
        let diabetes: Arc<dyn CohortResolver> = Arc::new(DiabetesResolver);
        let cardiometabolic: Arc<dyn CohortResolver> = Arc::new(CardiometabolicResolver);

        let mut registry = Self::with_fallback(generic.clone());
        registry.register(well_known::METABOLIC_SYNDROME, metabolic.clone());
        registry.register(well_known::PCOS, pcos.clone());
        for name in well_known::DIABETES_COHORTS {
            registry.register(*name, diabetes.clone());
        }
        for prefix in well_known::CARDIOMETABOLIC_PREFIXES {
            registry.register_prefix(*prefix, cardiometabolic.clone());
        }

        registry.register_logic("generic", generic);
        registry.register_logic("metabolic_syndrome", metabolic);
        registry.register_logic("pcos", pcos);
        registry.register_logic("diabetes", diabetes);
        registry.register_logic("cardiometabolic", cardiometabolic);
        registry
    }

    /// Registers a strategy for an exact cohort name.
    pub fn register(&mut self, cohort: impl Into<String>, resolver: Arc<dyn CohortResolver>) {
        self.by_name.insert(cohort.into(), resolver);
    }

    /// Registers a strategy for every cohort whose name starts with `prefix`.
    pub fn register_prefix(&mut self, prefix: impl Into<String>, resolver: Arc<dyn CohortResolver>) {
        let prefix = prefix.into();
        self.by_prefix.retain(|(p, _)| *p != prefix);
        self.by_prefix.push((prefix, resolver));
    }

    /// Registers a strategy under a `logic` key.
    pub fn register_logic(&mut self, key: impl Into<String>, resolver: Arc<dyn CohortResolver>) {
        self.by_logic.insert(key.into(), resolver);
    }

    /// Selects the strategy for a cohort.
    pub fn strategy_for(&self, cohort: &str, logic: Option<&str>) -> BuildResult<&dyn CohortResolver> {
        if let Some(key) = logic {
            return self
                .by_logic
                .get(key)
                .map(|r| r.as_ref())
                .ok_or_else(|| BuildError::InvalidValue {
                    key: "logic".to_string(),
                    reason: format!("no strategy registered for '{key}'"),
                });
        }

        if let Some(resolver) = self.by_name.get(cohort) {
            return Ok(resolver.as_ref());
        }

        let by_prefix = self
            .by_prefix
            .iter()
            .filter(|(prefix, _)| cohort.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len());
        if let Some((_, resolver)) = by_prefix {
            return Ok(resolver.as_ref());
        }

        Ok(self.fallback.as_ref())
    }

    /// Selects the strategy for a cohort spec.
    pub fn resolve(&self, spec: &CohortSpec) -> BuildResult<&dyn CohortResolver> {
        self.strategy_for(&spec.name, spec.logic.as_deref())
    }
}

impl fmt::Debug for CohortRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.by_name.keys().collect();
        names.sort();
        let mut logic: Vec<_> = self.by_logic.keys().collect();
        logic.sort();
        f.debug_struct("CohortRegistry")
            .field("names", &names)
            .field("prefixes", &self.by_prefix.iter().map(|(p, _)| p).collect::<Vec<_>>())
            .field("logic", &logic)
            .field("fallback", &self.fallback.name())
            .finish()
    }
}
