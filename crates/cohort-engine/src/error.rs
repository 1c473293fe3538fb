//! Error types for cohort evaluation.

use thiserror::Error;

/// Errors raised while loading or validating the criteria specification.
///
/// These are fatal and surface before any cohort is built.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The criteria file could not be read.
    #[error("IO error reading criteria file {path}: {source}")]
    Io {
        /// Path of the criteria file.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The criteria document is not valid YAML or has the wrong shape.
    #[error("Criteria parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// A cohort has no `inclusion` section.
    #[error("Cohort '{cohort}' is missing required 'inclusion' section")]
    MissingInclusion {
        /// The offending cohort.
        cohort: String,
    },

    /// A recognized key holds a value of the wrong type or range.
    #[error("Invalid value for '{key}' in cohort '{cohort}': {reason}")]
    InvalidValue {
        /// The offending cohort.
        cohort: String,
        /// The offending key.
        key: String,
        /// What was wrong with the value.
        reason: String,
    },
}

/// Errors raised inside a single cohort's pipeline.
#[derive(Error, Debug)]
pub enum BuildError {
    /// The cohort is not defined in the criteria specification.
    #[error("Unknown cohort: {0}")]
    UnknownCohort(String),

    /// A key the selected strategy needs is absent.
    #[error("Missing required key: {key}")]
    MissingKey {
        /// The missing key.
        key: String,
    },

    /// The cohort refers to another cohort that is not defined.
    #[error("Cohort '{cohort}' referenced by '{key}' is not defined")]
    MissingReference {
        /// The referenced cohort.
        cohort: String,
        /// The key that holds the reference.
        key: String,
    },

    /// A key holds a value the selected strategy cannot use.
    #[error("Invalid value for '{key}': {reason}")]
    InvalidValue {
        /// The offending key.
        key: String,
        /// What was wrong with the value.
        reason: String,
    },
}

/// Top-level engine error.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Criteria specification error.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// A cohort build failed.
    #[error("Failed to build cohort '{cohort}': {source}")]
    Build {
        /// The cohort being built.
        cohort: String,
        /// What went wrong.
        #[source]
        source: BuildError,
    },

    /// The assembled result violates the output contract.
    #[error("Validation failed for cohort '{cohort}': {reason}")]
    Validation {
        /// The cohort being validated.
        cohort: String,
        /// The violated constraint.
        reason: String,
    },
}

impl EngineError {
    /// Returns the cohort the error belongs to, if any.
    pub fn cohort(&self) -> Option<&str> {
        match self {
            Self::Configuration(ConfigError::MissingInclusion { cohort })
            | Self::Configuration(ConfigError::InvalidValue { cohort, .. })
            | Self::Build { cohort, .. }
            | Self::Validation { cohort, .. } => Some(cohort),
            Self::Configuration(_) => None,
        }
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Result type for strategy operations.
pub type BuildResult<T> = std::result::Result<T, BuildError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_missing_inclusion() {
        let err = ConfigError::MissingInclusion {
            cohort: "IBS".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Cohort 'IBS' is missing required 'inclusion' section"
        );
    }

    #[test]
    fn test_error_display_build_wraps_source() {
        let err = EngineError::Build {
            cohort: "GDM".to_string(),
            source: BuildError::MissingReference {
                cohort: "Diabetes_NoComp".to_string(),
                key: "lookback_no_diabetes".to_string(),
            },
        };
        assert_eq!(
            err.to_string(),
            "Failed to build cohort 'GDM': Cohort 'Diabetes_NoComp' referenced by \
             'lookback_no_diabetes' is not defined"
        );
    }

    #[test]
    fn test_error_display_validation() {
        let err = EngineError::Validation {
            cohort: "PCOS".to_string(),
            reason: "empty member id".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Validation failed for cohort 'PCOS': empty member id"
        );
    }

    #[test]
    fn test_error_cohort_accessor() {
        let err = EngineError::Build {
            cohort: "HTN_Conservative".to_string(),
            source: BuildError::UnknownCohort("HTN_Conservative".to_string()),
        };
        assert_eq!(err.cohort(), Some("HTN_Conservative"));

        let err = EngineError::Configuration(ConfigError::Io {
            path: "missing.yaml".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        });
        assert_eq!(err.cohort(), None);
    }
}
