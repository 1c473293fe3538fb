//! Cohort assembly: strategy dispatch, demographics join and validation.

use std::collections::HashSet;
use std::time::Instant;

use cohort_types::CohortResult;
use tracing::{error, info};

use crate::error::{BuildError, EngineError, EngineResult};
use crate::result::{CohortTable, CombinedCohorts};
use crate::{
    ClaimsQueryable, CohortContext, CohortRegistry, CriteriaConfig, EngineConfig, IndexDates,
};

/// Builds cohort tables from criteria over a claims store.
///
/// # Example
///
/// ```ignore
/// let assembler = CohortAssembler::new(&store, &criteria)
///     .with_config(EngineConfig::builder().with_validation(true).build());
///
/// let combined = assembler.build_all(["PCOS", "GDM"])?;
/// ```
pub struct CohortAssembler<'a> {
    store: &'a dyn ClaimsQueryable,
    criteria: &'a CriteriaConfig,
    registry: CohortRegistry,
    config: EngineConfig,
}

impl<'a> CohortAssembler<'a> {
    /// Creates an assembler with the default registry and configuration.
    pub fn new(store: &'a dyn ClaimsQueryable, criteria: &'a CriteriaConfig) -> Self {
        Self {
            store,
            criteria,
            registry: CohortRegistry::with_defaults(),
            config: EngineConfig::default(),
        }
    }

    /// Replaces the strategy registry.
    pub fn with_registry(mut self, registry: CohortRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Replaces the engine configuration.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// The criteria being evaluated.
    pub fn criteria(&self) -> &CriteriaConfig {
        self.criteria
    }

    /// Engine configuration in use.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Resolves a cohort's index dates without the demographics join.
    pub fn index_dates(&self, name: &str) -> EngineResult<IndexDates> {
        let build = || -> Result<IndexDates, BuildError> {
            let spec = self
                .criteria
                .cohort(name)
                .ok_or_else(|| BuildError::UnknownCohort(name.to_string()))?;
            let resolver = self.registry.resolve(spec)?;
            let ctx = CohortContext {
                cohort: name,
                spec,
                criteria: self.criteria,
                store: self.store,
                config: &self.config,
            };
            info!(cohort = name, strategy = resolver.name(), "Building cohort");
            resolver.resolve(&ctx)
        };

        build().map_err(|source| {
            error!(cohort = name, error = %source, "Cohort build failed");
            EngineError::Build {
                cohort: name.to_string(),
                source,
            }
        })
    }

    /// Builds one cohort table.
    pub fn build_cohort(&self, name: &str) -> EngineResult<CohortTable> {
        let start = Instant::now();
        let index_dates = self.index_dates(name)?;
        let table = self.assemble(name, index_dates);

        if self.config.validate_output {
            validate(&table)?;
        }

        info!(
            cohort = name,
            members = table.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Built cohort"
        );
        Ok(table)
    }

    /// Builds cohorts in order and unions them.
    ///
    /// Stops at the first failed cohort.
    pub fn build_all<I, S>(&self, names: I) -> EngineResult<CombinedCohorts>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let tables = names
            .into_iter()
            .map(|name| self.build_cohort(name.as_ref()))
            .collect::<EngineResult<Vec<_>>>()?;
        Ok(CombinedCohorts::from_tables(tables))
    }

    /// Builds every cohort of the criteria document in file order.
    pub fn build_every(&self) -> EngineResult<CombinedCohorts> {
        self.build_all(self.criteria.cohort_names())
    }

    /// Builds cohorts concurrently; output keeps the order of `names`.
    #[cfg(feature = "parallel")]
    pub fn build_all_parallel<S>(&self, names: &[S]) -> EngineResult<CombinedCohorts>
    where
        S: AsRef<str> + Sync,
    {
        use rayon::prelude::*;

        let tables = names
            .par_iter()
            .map(|name| self.build_cohort(name.as_ref()))
            .collect::<EngineResult<Vec<_>>>()?;
        Ok(CombinedCohorts::from_tables(tables))
    }

    fn assemble(&self, name: &str, index_dates: IndexDates) -> CohortTable {
        let columns = self.store.demographic_columns().to_vec();
        let rows = index_dates
            .into_iter()
            .map(|(member_id, index_date)| {
                let demographics = match self.store.member(&member_id) {
                    Some(member) => (0..columns.len())
                        .map(|i| member.field(i).unwrap_or_default().to_string())
                        .collect(),
                    None => vec![String::new(); columns.len()],
                };
                CohortResult {
                    member_id,
                    index_date,
                    demographics,
                    cohort: name.to_string(),
                }
            })
            .collect();

        CohortTable {
            cohort: name.to_string(),
            columns,
            rows,
        }
    }
}

/// Checks a table against the output contract.
fn validate(table: &CohortTable) -> EngineResult<()> {
    let invalid = |reason: String| EngineError::Validation {
        cohort: table.cohort.clone(),
        reason,
    };

    let mut seen = HashSet::with_capacity(table.rows.len());
    for row in &table.rows {
        if row.member_id.trim().is_empty() {
            return Err(invalid("row with empty member id".to_string()));
        }
        if row.demographics.len() != table.columns.len() {
            return Err(invalid(format!(
                "member {} has {} demographic fields, expected {}",
                row.member_id,
                row.demographics.len(),
                table.columns.len()
            )));
        }
        if !seen.insert(row.member_id.as_str()) {
            return Err(invalid(format!("member {} appears more than once", row.member_id)));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(members: &[&str]) -> CohortTable {
        CohortTable {
            cohort: "PCOS".to_string(),
            columns: Vec::new(),
            rows: members
                .iter()
                .map(|m| CohortResult {
                    member_id: m.to_string(),
                    index_date: "2023-01-01".parse().unwrap(),
                    demographics: Vec::new(),
                    cohort: "PCOS".to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_validate_accepts_unique_members() {
        assert!(validate(&table(&["M1", "M2"])).is_ok());
    }

    #[test]
    fn test_validate_rejects_duplicates() {
        let err = validate(&table(&["M1", "M1"])).unwrap_err();
        assert!(matches!(err, EngineError::Validation { ref cohort, .. } if cohort == "PCOS"));
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_validate_rejects_empty_member() {
        let err = validate(&table(&[" "])).unwrap_err();
        assert!(err.to_string().contains("empty member id"));
    }
}
