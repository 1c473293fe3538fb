//! Engine configuration.

use chrono::{Local, NaiveDate};
use cohort_types::well_known;

/// Configuration for cohort evaluation.
///
/// # Example
///
/// ```rust
/// use chrono::NaiveDate;
/// use cohort_engine::EngineConfig;
///
/// let config = EngineConfig::builder()
///     .with_reference_date(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap())
///     .with_validation(true)
///     .build();
///
/// assert_eq!(config.non_procedure_code, "0000000");
/// ```
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// "Today" for relative date ranges (`date_range_years`).
    pub reference_date: NaiveDate,
    /// Procedure code that never counts as procedure support.
    pub non_procedure_code: String,
    /// Whether assembled tables are checked against the output contract.
    pub validate_output: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            reference_date: Local::now().date_naive(),
            non_procedure_code: well_known::NON_PROCEDURE_CODE.to_string(),
            validate_output: true,
        }
    }
}

impl EngineConfig {
    /// Creates a new builder for EngineConfig.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }
}

/// Builder for EngineConfig.
#[derive(Debug, Clone, Default)]
pub struct EngineConfigBuilder {
    reference_date: Option<NaiveDate>,
    non_procedure_code: Option<String>,
    validate_output: Option<bool>,
}

impl EngineConfigBuilder {
    /// Pins the reference date instead of using the local date.
    pub fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = Some(date);
        self
    }

    /// Overrides the non-procedure sentinel code.
    pub fn with_non_procedure_code(mut self, code: impl Into<String>) -> Self {
        self.non_procedure_code = Some(code.into());
        self
    }

    /// Enables or disables output validation.
    pub fn with_validation(mut self, validate: bool) -> Self {
        self.validate_output = Some(validate);
        self
    }

    /// Builds the EngineConfig.
    pub fn build(self) -> EngineConfig {
        let defaults = EngineConfig::default();
        EngineConfig {
            reference_date: self.reference_date.unwrap_or(defaults.reference_date),
            non_procedure_code: self
                .non_procedure_code
                .unwrap_or(defaults.non_procedure_code),
            validate_output: self.validate_output.unwrap_or(defaults.validate_output),
        }
    }
}
