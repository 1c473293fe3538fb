//! # cohort-types
//!
//! Type definitions for claims-based cohort extraction.
//!
//! This crate provides Rust type definitions for the normalized claims tables
//! (encounter entries and their diagnosis, procedure and drug associations),
//! member demographics, and the index-date records produced by the cohort
//! engine.
//!
//! ## Features
//!
//! - `serde` (default): Enables serialization/deserialization support via serde.
//!
//! ## Usage
//!
//! ```rust
//! use chrono::NaiveDate;
//! use cohort_types::{Claim, ClaimType, ServiceEvent};
//!
//! let claim = Claim {
//!     claim_entry_id: "1".to_string(),
//!     member_id: "M1".to_string(),
//!     date_of_service: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
//!     diagnosis_code: "I10".to_string(),
//!     claim_type: ClaimType::Medical,
//! };
//!
//! assert_eq!(claim.member_id(), "M1");
//! assert!(claim.claim_type.is_medical());
//! ```

#![warn(missing_docs)]

mod claim;
mod entry;
mod enums;
mod member;
mod result;
pub mod well_known;

// Re-export all public types at crate root
pub use claim::{Claim, DrugClaim, ProcedureClaim, ServiceEvent};
pub use entry::{ClaimEntry, DiagnosisEntry, DrugEntry, ProcedureEntry};
pub use enums::ClaimType;
pub use member::{Member, MemberId};
pub use result::{CohortResult, IndexDateRecord};
