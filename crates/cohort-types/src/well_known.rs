//! Well-known claims-table names, columns and cohort identifiers.
//!
//! # Examples
//!
//! ```
//! use cohort_types::well_known;
//!
//! assert_eq!(well_known::NON_PROCEDURE_CODE, "0000000");
//! assert!(well_known::DIABETES_COHORTS.contains(&"GDM"));
//! ```

// =============================================================================
// Claim Types
// =============================================================================

/// Claim type of professional/facility claims.
pub const MEDICAL_CLAIM_TYPE: &str = "medical";

/// Claim type of pharmacy claims. Only these carry medication support.
pub const PHARMACY_CLAIM_TYPE: &str = "pharma";

/// Placeholder procedure code meaning "no procedure performed".
///
/// Never counts as procedure support.
pub const NON_PROCEDURE_CODE: &str = "0000000";

// =============================================================================
// Tables
// =============================================================================

/// Encounter entries table.
pub const CLAIMS_ENTRIES_TABLE: &str = "claims_entries";

/// Diagnosis associations table.
pub const CLAIMS_DIAGNOSES_TABLE: &str = "claims_diagnoses";

/// Procedure associations table.
pub const CLAIMS_PROCEDURES_TABLE: &str = "claims_procedures";

/// Drug associations table.
pub const CLAIMS_DRUGS_TABLE: &str = "claims_drugs";

/// Member demographics table.
pub const MEMBERS_TABLE: &str = "members";

// =============================================================================
// Columns
// =============================================================================

/// Encounter identifier column, shared by every claims table.
pub const CLAIM_ENTRY_ID_COLUMN: &str = "claim_entry_id";

/// Hashed member identifier column in the store.
pub const MEMBER_ID_COLUMN: &str = "member_id_hash";

/// Date of service column of the entries table.
pub const DATE_OF_SERVICE_COLUMN: &str = "date_of_service";

/// Claim type column of the entries table.
pub const CLAIM_TYPE_COLUMN: &str = "claim_type";

/// Diagnosis code column.
pub const ICD_CODE_COLUMN: &str = "icd_code";

/// Procedure code column.
pub const PROC_CODE_COLUMN: &str = "proc_code";

/// Drug product name column.
pub const PRODUCT_NAME_COLUMN: &str = "product_service_name";

/// Member identifier column of cohort outputs.
pub const OUTPUT_MEMBER_ID_COLUMN: &str = "member_id";

/// Index date column of cohort outputs.
pub const OUTPUT_INDEX_DATE_COLUMN: &str = "index_date";

/// Cohort label column of cohort outputs.
pub const OUTPUT_COHORT_COLUMN: &str = "cohort";

// =============================================================================
// Cohorts
// =============================================================================

/// Metabolic syndrome cohort.
pub const METABOLIC_SYNDROME: &str = "Metabolic_Syndrome";

/// Polycystic ovary syndrome cohort.
pub const PCOS: &str = "PCOS";

/// Diabetes without complications.
pub const DIABETES_NO_COMP: &str = "Diabetes_NoComp";

/// Diabetes with hypertension.
pub const DIABETES_HTN: &str = "Diabetes_HTN";

/// Diabetes with kidney involvement.
pub const DIABETES_KIDNEY: &str = "Diabetes_Kidney";

/// Pre-diabetes.
pub const PRE_DIABETES: &str = "PreDiabetes";

/// Gestational diabetes.
pub const GDM: &str = "GDM";

/// Every diabetes subtype cohort.
pub const DIABETES_COHORTS: &[&str] = &[
    DIABETES_NO_COMP,
    DIABETES_HTN,
    DIABETES_KIDNEY,
    PRE_DIABETES,
    GDM,
];

/// Name prefixes of the cardiometabolic cohort family.
pub const CARDIOMETABOLIC_PREFIXES: &[&str] = &["HTN_", "Dyslipidemia_", "CAD_CHD_"];
