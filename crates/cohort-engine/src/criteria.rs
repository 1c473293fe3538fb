//! Declarative cohort criteria.
//!
//! Criteria are read from a YAML document of the form:
//!
//! ```yaml
//! cohorts:
//!   PCOS:
//!     inclusion:
//!       icd_codes: ["E28.2"]
//!       min_claims: 2
//!       min_days_between_claims: 30
//!     exclusion:
//!       cushing: ["E24.*"]
//! ```
//!
//! Cohorts keep their file order. Every cohort must carry an `inclusion`
//! section with `icd_codes`; anything else is optional. Keys the engine does
//! not recognize are kept so they can be echoed into output metadata.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use cohort_types::ClaimType;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ConfigError;

/// How the generic window resolver treats `min_claims`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowMode {
    /// First consecutive pair whose gap meets `min_days_between_claims`.
    #[default]
    Pairwise,
    /// Earliest completed chain of `min_claims` claims, each at least
    /// `min_days_between_claims` after the previous one.
    NClaim,
}

/// The `inclusion` section of a cohort.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InclusionSpec {
    /// Qualifying diagnosis code patterns.
    pub icd_codes: Vec<String>,
    /// Claim types the qualifying claims must have.
    #[serde(default)]
    pub claim_types: Option<Vec<String>>,
    /// Minimum number of qualifying claims.
    #[serde(default)]
    pub min_claims: Option<usize>,
    /// Minimum gap, in days, between counted claims.
    #[serde(default)]
    pub min_days_between_claims: Option<i64>,
    /// Maximum first-to-last claim span, in 30-day months.
    #[serde(default)]
    pub within_months: Option<i64>,
    /// Only claims within this many years of the reference date count.
    #[serde(default)]
    pub date_range_years: Option<u32>,
    /// Window resolution mode of the generic strategy.
    #[serde(default)]
    pub window_mode: WindowMode,
    /// Symptom codes that must corroborate each qualifying claim.
    #[serde(default)]
    pub symptom_codes: Option<Vec<String>>,
    /// Symptom corroboration window, in days either side of the claim.
    #[serde(default)]
    pub symptom_window_days: Option<i64>,
    /// Enables procedure support gating.
    #[serde(default)]
    pub allow_procedure: bool,
    /// Procedure code patterns that count as support.
    #[serde(default)]
    pub procedure_codes: Option<Vec<String>>,
    /// Enables medication support gating.
    #[serde(default)]
    pub allow_medication: bool,
    /// Drug product-name patterns that count as support.
    #[serde(default)]
    pub medication_codes: Option<Vec<String>>,
    /// AND (true) or OR (false) combination of the two support checks.
    #[serde(default = "default_require_both")]
    pub require_both_procedure_and_medication: bool,
    /// Restricts support to a trailing window ending at the index date.
    #[serde(default)]
    pub support_window_days: Option<i64>,
    /// Months of "no prior diabetes" required before a qualifying claim.
    #[serde(default)]
    pub lookback_no_diabetes: Option<u32>,
    /// Component categories of a component-window path, label to codes.
    #[serde(default)]
    pub components: Option<IndexMap<String, Vec<String>>>,
    /// Distinct components required inside one component window.
    #[serde(default)]
    pub min_components: Option<usize>,
    /// Length of the component window in days.
    #[serde(default)]
    pub component_window_days: Option<i64>,
    /// Unrecognized keys, kept verbatim.
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

fn default_require_both() -> bool {
    true
}

impl InclusionSpec {
    /// Returns the configured claim types, parsed.
    pub fn claim_types(&self) -> Option<Vec<ClaimType>> {
        self.claim_types
            .as_ref()
            .map(|types| types.iter().map(|t| ClaimType::from(t.as_str())).collect())
    }

    /// Returns the procedure codes when procedure support is enabled.
    pub fn procedure_support_codes(&self) -> Option<&[String]> {
        match (&self.procedure_codes, self.allow_procedure) {
            (Some(codes), true) if !codes.is_empty() => Some(codes),
            _ => None,
        }
    }

    /// Returns the medication names when medication support is enabled.
    pub fn medication_support_codes(&self) -> Option<&[String]> {
        match (&self.medication_codes, self.allow_medication) {
            (Some(codes), true) if !codes.is_empty() => Some(codes),
            _ => None,
        }
    }

    fn validate(&self, cohort: &str) -> Result<(), ConfigError> {
        let day_keys = [
            ("min_days_between_claims", self.min_days_between_claims),
            ("symptom_window_days", self.symptom_window_days),
            ("support_window_days", self.support_window_days),
            ("component_window_days", self.component_window_days),
        ];
        for (key, value) in day_keys {
            if let Some(value) = value {
                check_span(cohort, key, value, MAX_WINDOW_DAYS)?;
            }
        }
        if let Some(months) = self.within_months {
            check_span(cohort, "within_months", months, MAX_WINDOW_DAYS / 30)?;
        }
        if self.min_claims == Some(0) {
            return Err(ConfigError::InvalidValue {
                cohort: cohort.to_string(),
                key: "min_claims".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Largest accepted day count for any window or gap setting.
pub const MAX_WINDOW_DAYS: i64 = 36_500;

fn check_span(cohort: &str, key: &str, value: i64, max: i64) -> Result<(), ConfigError> {
    if (0..=max).contains(&value) {
        return Ok(());
    }
    Err(ConfigError::InvalidValue {
        cohort: cohort.to_string(),
        key: key.to_string(),
        reason: format!("must be between 0 and {max}, got {value}"),
    })
}

/// A single value of the `exclusion` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExclusionValue {
    /// A day count, such as `subtype_window_days`.
    Days(i64),
    /// A list of code patterns.
    Codes(Vec<String>),
}

impl ExclusionValue {
    /// Parses one exclusion entry: a list of strings or a day count.
    fn from_raw(cohort: &str, key: &str, raw: &Value) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidValue {
            cohort: cohort.to_string(),
            key: format!("exclusion.{key}"),
            reason,
        };
        match raw {
            Value::Array(items) => items
                .iter()
                .map(|item| item.as_str().map(str::to_string))
                .collect::<Option<Vec<_>>>()
                .map(Self::Codes)
                .ok_or_else(|| invalid(format!("codes must be quoted strings, got {raw}"))),
            Value::Number(number) => {
                let days = number
                    .as_i64()
                    .ok_or_else(|| invalid(format!("must be a whole number of days, got {number}")))?;
                check_span(cohort, &format!("exclusion.{key}"), days, MAX_WINDOW_DAYS)?;
                Ok(Self::Days(days))
            }
            other => Err(invalid(format!(
                "must be a list of codes or a day count, got {other}"
            ))),
        }
    }
}

/// The `exclusion` section of a cohort, in file order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExclusionSpec {
    entries: IndexMap<String, ExclusionValue>,
}

impl ExclusionSpec {
    /// Returns the code list stored under `key`.
    pub fn codes(&self, key: &str) -> Option<&[String]> {
        match self.entries.get(key) {
            Some(ExclusionValue::Codes(codes)) => Some(codes),
            _ => None,
        }
    }

    /// Returns the day count stored under `key`.
    pub fn days(&self, key: &str) -> Option<i64> {
        match self.entries.get(key) {
            Some(ExclusionValue::Days(days)) => Some(*days),
            _ => None,
        }
    }

    /// Iterates over every entry in file order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ExclusionValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns true if the section is absent or empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl FromIterator<(String, ExclusionValue)> for ExclusionSpec {
    fn from_iter<T: IntoIterator<Item = (String, ExclusionValue)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// One cohort's criteria.
#[derive(Debug, Clone, PartialEq)]
pub struct CohortSpec {
    /// Cohort name, as keyed in the document.
    pub name: String,
    /// Optional strategy key overriding name-based strategy selection.
    pub logic: Option<String>,
    /// Inclusion criteria.
    pub inclusion: InclusionSpec,
    /// Exclusion criteria.
    pub exclusion: ExclusionSpec,
    /// Free-form tags, carried into metadata.
    pub tags: Option<Value>,
    raw_inclusion: Value,
    raw_exclusion: Value,
}

impl CohortSpec {
    /// The `inclusion` section exactly as written.
    pub fn raw_inclusion(&self) -> &Value {
        &self.raw_inclusion
    }

    /// The `exclusion` section exactly as written (`{}` when absent).
    pub fn raw_exclusion(&self) -> &Value {
        &self.raw_exclusion
    }

    fn from_raw(name: String, raw: RawCohortSpec) -> Result<Self, ConfigError> {
        let raw_inclusion = raw.inclusion.ok_or_else(|| ConfigError::MissingInclusion {
            cohort: name.clone(),
        })?;
        if raw_inclusion.is_null() {
            return Err(ConfigError::MissingInclusion { cohort: name });
        }

        let inclusion: InclusionSpec =
            serde_json::from_value(raw_inclusion.clone()).map_err(|e| {
                ConfigError::InvalidValue {
                    cohort: name.clone(),
                    key: "inclusion".to_string(),
                    reason: e.to_string(),
                }
            })?;
        inclusion.validate(&name)?;

        let raw_entries = raw.exclusion.unwrap_or_default();
        let exclusion = raw_entries
            .iter()
            .map(|(key, value)| {
                ExclusionValue::from_raw(&name, key, value).map(|parsed| (key.clone(), parsed))
            })
            .collect::<Result<ExclusionSpec, _>>()?;
        let raw_exclusion = Value::Object(raw_entries.into_iter().collect());

        Ok(Self {
            name,
            logic: raw.logic,
            inclusion,
            exclusion,
            tags: raw.tags,
            raw_inclusion,
            raw_exclusion,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawCriteria {
    #[serde(default)]
    cohorts: IndexMap<String, RawCohortSpec>,
}

#[derive(Debug, Deserialize)]
struct RawCohortSpec {
    #[serde(default)]
    inclusion: Option<Value>,
    #[serde(default)]
    exclusion: Option<IndexMap<String, Value>>,
    #[serde(default)]
    tags: Option<Value>,
    #[serde(default)]
    logic: Option<String>,
}

/// The full criteria document.
///
/// # Example
///
/// ```rust
/// use cohort_engine::CriteriaConfig;
///
/// let yaml = r#"
/// cohorts:
///   HTN_Conservative:
///     inclusion:
///       icd_codes: ["I10"]
///       min_claims: 2
/// "#;
///
/// let criteria: CriteriaConfig = yaml.parse().unwrap();
/// assert_eq!(criteria.cohort_names().collect::<Vec<_>>(), ["HTN_Conservative"]);
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CriteriaConfig {
    cohorts: IndexMap<String, CohortSpec>,
}

impl CriteriaConfig {
    /// Reads and validates a criteria file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        text.parse()
    }

    /// Returns the criteria of one cohort.
    pub fn cohort(&self, name: &str) -> Option<&CohortSpec> {
        self.cohorts.get(name)
    }

    /// Iterates over cohort names in file order.
    pub fn cohort_names(&self) -> impl Iterator<Item = &str> {
        self.cohorts.keys().map(String::as_str)
    }

    /// Iterates over every cohort in file order.
    pub fn cohorts(&self) -> impl Iterator<Item = &CohortSpec> {
        self.cohorts.values()
    }

    /// Returns the number of cohorts.
    pub fn len(&self) -> usize {
        self.cohorts.len()
    }

    /// Returns true if no cohorts are defined.
    pub fn is_empty(&self) -> bool {
        self.cohorts.is_empty()
    }
}

impl FromStr for CriteriaConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw: RawCriteria = match serde_yaml::from_str::<Option<RawCriteria>>(s)? {
            Some(raw) => raw,
            None => return Ok(Self::default()),
        };

        let mut cohorts = IndexMap::with_capacity(raw.cohorts.len());
        for (name, spec) in raw.cohorts {
            let spec = CohortSpec::from_raw(name.clone(), spec)?;
            cohorts.insert(name, spec);
        }
        Ok(Self { cohorts })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CRITERIA: &str = r#"
cohorts:
  IBS_Conservative:
    inclusion:
      icd_codes: ["K58.*"]
      claim_types: [medical]
      min_claims: 2
      min_days_between_claims: 30
      reviewer: analytics
    exclusion:
      subtypes: ["K58.1", "K58.2"]
      subtype_window_days: 30
    tags:
      group: gi
  PCOS:
    logic: pcos
    inclusion:
      icd_codes: ["E28.2"]
"#;

    #[test]
    fn test_parse_preserves_file_order() {
        let criteria: CriteriaConfig = CRITERIA.parse().unwrap();
        let names: Vec<_> = criteria.cohort_names().collect();
        assert_eq!(names, ["IBS_Conservative", "PCOS"]);
        assert_eq!(criteria.len(), 2);
    }

    #[test]
    fn test_parse_inclusion_fields_and_defaults() {
        let criteria: CriteriaConfig = CRITERIA.parse().unwrap();
        let ibs = criteria.cohort("IBS_Conservative").unwrap();

        assert_eq!(ibs.inclusion.icd_codes, vec!["K58.*"]);
        assert_eq!(ibs.inclusion.claim_types(), Some(vec![ClaimType::Medical]));
        assert_eq!(ibs.inclusion.min_claims, Some(2));
        assert!(ibs.inclusion.require_both_procedure_and_medication);
        assert_eq!(ibs.inclusion.window_mode, WindowMode::Pairwise);
        assert_eq!(
            ibs.inclusion.extra.get("reviewer"),
            Some(&Value::String("analytics".to_string()))
        );
        assert!(ibs.logic.is_none());
    }

    #[test]
    fn test_parse_exclusion_values() {
        let criteria: CriteriaConfig = CRITERIA.parse().unwrap();
        let ibs = criteria.cohort("IBS_Conservative").unwrap();

        assert_eq!(
            ibs.exclusion.codes("subtypes"),
            Some(&["K58.1".to_string(), "K58.2".to_string()][..])
        );
        assert_eq!(ibs.exclusion.days("subtype_window_days"), Some(30));
        assert_eq!(ibs.exclusion.codes("subtype_window_days"), None);

        let pcos = criteria.cohort("PCOS").unwrap();
        assert!(pcos.exclusion.is_empty());
        assert_eq!(pcos.raw_exclusion(), &serde_json::json!({}));
        assert_eq!(pcos.logic.as_deref(), Some("pcos"));
    }

    #[test]
    fn test_missing_inclusion_is_fatal() {
        let yaml = "cohorts:\n  Broken:\n    exclusion:\n      hiv: [\"B20\"]\n";
        let err = yaml.parse::<CriteriaConfig>().unwrap_err();
        assert!(matches!(err, ConfigError::MissingInclusion { cohort } if cohort == "Broken"));
    }

    #[test]
    fn test_missing_icd_codes_is_invalid() {
        let yaml = "cohorts:\n  Broken:\n    inclusion:\n      min_claims: 2\n";
        let err = yaml.parse::<CriteriaConfig>().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key, .. } if key == "inclusion"));
    }

    #[test]
    fn test_negative_window_is_invalid() {
        let yaml = "cohorts:\n  X:\n    inclusion:\n      icd_codes: [A]\n      min_days_between_claims: -5\n";
        let err = yaml.parse::<CriteriaConfig>().unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidValue { key, .. } if key == "min_days_between_claims")
        );
    }

    #[test]
    fn test_oversized_window_is_invalid() {
        let yaml = "cohorts:\n  X:\n    inclusion:\n      icd_codes: [A]\n      support_window_days: 1000000000\n";
        let err = yaml.parse::<CriteriaConfig>().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key, .. } if key == "support_window_days"));

        let yaml = "cohorts:\n  X:\n    inclusion:\n      icd_codes: [A]\n      within_months: 5000\n";
        let err = yaml.parse::<CriteriaConfig>().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key, .. } if key == "within_months"));
    }

    #[test]
    fn test_oversized_exclusion_window_is_invalid() {
        let yaml = r#"
cohorts:
  IBS:
    inclusion:
      icd_codes: ["K58.*"]
    exclusion:
      organic_gi: ["K50.*"]
      organic_gi_window_days: 1000000000
"#;
        let err = yaml.parse::<CriteriaConfig>().unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidValue { key, .. } if key == "exclusion.organic_gi_window_days")
        );
    }

    #[test]
    fn test_malformed_exclusion_values_are_invalid() {
        for value in ["[42]", "[\"B20\", 7]", "-3", "2.5", "true", "{a: b}"] {
            let yaml = format!(
                "cohorts:\n  PCOS:\n    inclusion:\n      icd_codes: [E28.2]\n    exclusion:\n      hiv: {value}\n"
            );
            let err = yaml.parse::<CriteriaConfig>().unwrap_err();
            assert!(
                matches!(&err, ConfigError::InvalidValue { key, .. } if key == "exclusion.hiv"),
                "{value}: {err}"
            );
        }
    }

    #[test]
    fn test_exclusion_keeps_file_order() {
        let yaml = r#"
cohorts:
  X:
    inclusion:
      icd_codes: [A]
    exclusion:
      zeta: ["Z1"]
      alpha: ["A1"]
      zeta_window_days: 10
"#;
        let criteria: CriteriaConfig = yaml.parse().unwrap();
        let keys: Vec<_> = criteria.cohort("X").unwrap().exclusion.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["zeta", "alpha", "zeta_window_days"]);
    }

    #[test]
    fn test_window_mode_n_claim() {
        let yaml = "cohorts:\n  X:\n    inclusion:\n      icd_codes: [A]\n      window_mode: n_claim\n";
        let criteria: CriteriaConfig = yaml.parse().unwrap();
        assert_eq!(
            criteria.cohort("X").unwrap().inclusion.window_mode,
            WindowMode::NClaim
        );
    }

    #[test]
    fn test_support_codes_require_allow_flag() {
        let yaml = r#"
cohorts:
  X:
    inclusion:
      icd_codes: [I10]
      procedure_codes: ["93000"]
      allow_medication: true
      medication_codes: []
"#;
        let criteria: CriteriaConfig = yaml.parse().unwrap();
        let inclusion = &criteria.cohort("X").unwrap().inclusion;
        assert!(inclusion.procedure_support_codes().is_none());
        assert!(inclusion.medication_support_codes().is_none());
    }

    #[test]
    fn test_empty_document_has_no_cohorts() {
        let criteria: CriteriaConfig = "".parse().unwrap();
        assert!(criteria.is_empty());
    }

    #[test]
    fn test_from_path_reads_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cohorts.yaml");
        fs::write(&path, CRITERIA).unwrap();

        let criteria = CriteriaConfig::from_path(&path).unwrap();
        assert_eq!(criteria, CRITERIA.parse::<CriteriaConfig>().unwrap());
        assert!(criteria.cohort("PCOS").is_some());
    }

    #[test]
    fn test_from_path_reports_io_error() {
        let err = CriteriaConfig::from_path("/nonexistent/cohorts.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
