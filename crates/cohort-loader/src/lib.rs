//! # cohort-loader
//!
//! Claims table loader and in-memory claims store.
//!
//! Reads the five normalized claims tables (`claims_entries`,
//! `claims_diagnoses`, `claims_procedures`, `claims_drugs`, `members`) from a
//! data directory, validates their headers, joins code rows onto encounters
//! and serves the result through [`cohort_engine::ClaimsQueryable`].
//!
//! ## Features
//!
//! - `parallel` (default): Enables [`ClaimsStore::load_all_parallel`] via rayon.
//!
//! ## Example
//!
//! ```ignore
//! use cohort_loader::{discover_claims_tables, ClaimsStore, LoadConfig};
//!
//! let tables = discover_claims_tables("/data/claims")?;
//! let store = ClaimsStore::load_all(&tables, &LoadConfig::default())?;
//! println!("{:?}", store.stats());
//! ```

#![warn(missing_docs)]

mod diagnosis;
mod drug;
mod entry;
mod loader;
mod member;
pub mod parser;
mod procedure;
mod queryable;
mod store;
mod types;

pub use loader::discover_claims_tables;
pub use member::demographic_columns;
pub use parser::{ColumnIndex, TableParser, TableRecord};
pub use store::{ClaimsStore, ClaimsTableRows};
pub use types::{ClaimsError, ClaimsResult, ClaimsTables, LoadConfig, LoadStats};

// Re-export cohort-types for convenience
pub use cohort_types;
