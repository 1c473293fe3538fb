//! Claim classification enums.

use std::fmt;
use std::str::FromStr;

use crate::well_known;

/// Classification of an encounter claim.
///
/// The claims store carries the claim type as free text. The two values the
/// engine reasons about (`medical` and `pharma`) have dedicated variants; any
/// other value is kept verbatim so claim-type filters can still match it.
///
/// # Examples
///
/// ```
/// use cohort_types::ClaimType;
///
/// let claim_type: ClaimType = "pharma".parse().unwrap();
/// assert_eq!(claim_type, ClaimType::Pharma);
/// assert_eq!(ClaimType::from("dental").as_str(), "dental");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(from = "String", into = "String"))]
pub enum ClaimType {
    /// Professional or facility medical claim.
    Medical,
    /// Pharmacy (drug) claim.
    Pharma,
    /// Any other claim type, stored as found.
    Other(String),
}

impl ClaimType {
    /// Returns the stored text form of this claim type.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Medical => well_known::MEDICAL_CLAIM_TYPE,
            Self::Pharma => well_known::PHARMACY_CLAIM_TYPE,
            Self::Other(value) => value,
        }
    }

    /// Returns true for medical claims.
    pub fn is_medical(&self) -> bool {
        matches!(self, Self::Medical)
    }

    /// Returns true for pharmacy claims.
    pub fn is_pharmacy(&self) -> bool {
        matches!(self, Self::Pharma)
    }
}

impl From<&str> for ClaimType {
    fn from(value: &str) -> Self {
        match value {
            well_known::MEDICAL_CLAIM_TYPE => Self::Medical,
            well_known::PHARMACY_CLAIM_TYPE => Self::Pharma,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for ClaimType {
    fn from(value: String) -> Self {
        match value.as_str() {
            well_known::MEDICAL_CLAIM_TYPE => Self::Medical,
            well_known::PHARMACY_CLAIM_TYPE => Self::Pharma,
            _ => Self::Other(value),
        }
    }
}

impl From<ClaimType> for String {
    fn from(value: ClaimType) -> Self {
        match value {
            ClaimType::Other(value) => value,
            known => known.as_str().to_string(),
        }
    }
}

impl FromStr for ClaimType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

impl fmt::Display for ClaimType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_type_from_str() {
        assert_eq!(ClaimType::from("medical"), ClaimType::Medical);
        assert_eq!(ClaimType::from("pharma"), ClaimType::Pharma);
        assert_eq!(
            ClaimType::from("Medical"),
            ClaimType::Other("Medical".to_string())
        );
    }

    #[test]
    fn test_claim_type_display_round_trips_text() {
        for text in ["medical", "pharma", "vision", ""] {
            assert_eq!(ClaimType::from(text).to_string(), text);
        }
    }

    #[test]
    fn test_claim_type_predicates() {
        assert!(ClaimType::Medical.is_medical());
        assert!(!ClaimType::Medical.is_pharmacy());
        assert!(ClaimType::Pharma.is_pharmacy());
        assert!(!ClaimType::Other("pharmacy".into()).is_pharmacy());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_claim_type_serializes_as_text() {
        let json = serde_json::to_string(&ClaimType::Pharma).unwrap();
        assert_eq!(json, "\"pharma\"");
        let parsed: ClaimType = serde_json::from_str("\"lab\"").unwrap();
        assert_eq!(parsed, ClaimType::Other("lab".to_string()));
    }
}
