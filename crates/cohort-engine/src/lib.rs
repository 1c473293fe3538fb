//! # cohort-engine
//!
//! Rule-evaluation engine that turns declarative cohort criteria into
//! per-member index dates over a claims store.
//!
//! The pipeline for one cohort is:
//!
//! 1. **Inclusion**: select diagnosis claims matching the inclusion codes
//!    (and claim types, date range, symptom corroboration).
//! 2. **Index dates**: resolve each member's earliest qualifying date with
//!    the window resolver, then gate on procedure/medication support.
//! 3. **Exclusions**: subtract members through a cascade of exclusion rules.
//! 4. **Assembly**: join member demographics, validate, label with the cohort.
//!
//! Condition-specific logic lives in [`CohortResolver`] strategies selected
//! through a [`CohortRegistry`] that is built at start-up and handed to the
//! [`CohortAssembler`].
//!
//! ## Features
//!
//! - `parallel`: Enables [`CohortAssembler::build_all_parallel`] via rayon.
//!
//! ## Example
//!
//! ```ignore
//! use cohort_engine::{CohortAssembler, CriteriaConfig};
//!
//! let criteria = CriteriaConfig::from_path("configs/cohorts.yaml")?;
//! let assembler = CohortAssembler::new(&store, &criteria);
//!
//! let table = assembler.build_cohort("PCOS")?;
//! println!("{} members", table.len());
//! ```

#![warn(missing_docs)]

mod assembler;
mod code_filter;
mod config;
pub mod criteria;
mod error;
pub mod exclusion;
mod index;
mod resolver;
pub mod resolvers;
mod result;
pub mod support;
mod traits;
pub mod window;

pub use assembler::CohortAssembler;
pub use code_filter::CodeFilter;
pub use config::{EngineConfig, EngineConfigBuilder};
pub use criteria::{CohortSpec, CriteriaConfig, ExclusionSpec, ExclusionValue, InclusionSpec, WindowMode};
pub use error::{BuildError, BuildResult, ConfigError, EngineError, EngineResult};
pub use exclusion::{ExclusionCascade, ExclusionRule, LookbackRule};
pub use index::MemberDateIndex;
pub use resolver::{CohortContext, CohortRegistry, CohortResolver};
pub use result::{CohortTable, CombinedCohorts};
pub use support::{SupportEvaluator, SupportRequirement};
pub use traits::ClaimsQueryable;
pub use window::IndexDates;

/// Re-export of the types crate.
pub use cohort_types;
