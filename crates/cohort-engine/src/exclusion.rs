//! Exclusion rules.
//!
//! Each rule is a set subtraction over the current index-date set. Rules in
//! a cascade apply independently and cumulatively, and every rule issues a
//! single store query for its code set.

use std::collections::BTreeSet;

use chrono::{Months, NaiveDate};
use cohort_types::{Claim, MemberId};
use tracing::{debug, info};

use crate::{ClaimsQueryable, CodeFilter, IndexDates, MemberDateIndex};

/// One exclusion rule shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExclusionRule {
    /// Drop a record with a matching claim within `window_days` either side
    /// of the index date.
    WithinWindow {
        /// Exclusion key the rule was built from.
        key: String,
        /// Code patterns.
        codes: Vec<String>,
        /// Window half-width in days.
        window_days: i64,
    },
    /// Drop a member with a matching claim at any time.
    Presence {
        /// Exclusion key the rule was built from.
        key: String,
        /// Code patterns.
        codes: Vec<String>,
    },
    /// Drop a member with a matching claim on or before the index date.
    OnOrBeforeIndex {
        /// Exclusion key the rule was built from.
        key: String,
        /// Code patterns.
        codes: Vec<String>,
    },
    /// Drop members having any matching claim in any listed condition.
    ExcludedConditions {
        /// `(key, codes)` per excluded condition.
        conditions: Vec<(String, Vec<String>)>,
    },
}

impl ExclusionRule {
    /// Short description used in logs.
    pub fn label(&self) -> String {
        match self {
            Self::WithinWindow {
                key, window_days, ..
            } => format!("{key} within {window_days} days"),
            Self::Presence { key, .. } => format!("{key} ever"),
            Self::OnOrBeforeIndex { key, .. } => format!("{key} on or before index"),
            Self::ExcludedConditions { conditions } => {
                let keys: Vec<&str> = conditions.iter().map(|(k, _)| k.as_str()).collect();
                format!("excluded conditions [{}]", keys.join(", "))
            }
        }
    }

    /// Applies the rule, returning the surviving records.
    pub fn apply(&self, store: &dyn ClaimsQueryable, mut index_dates: IndexDates) -> IndexDates {
        if index_dates.is_empty() {
            return index_dates;
        }

        match self {
            Self::WithinWindow {
                codes, window_days, ..
            } => {
                let index = matching_dates(store, codes);
                index_dates.retain(|m, date| !index.any_within(m, *date, *window_days));
            }
            Self::Presence { codes, .. } => {
                let excluded = store.members_with_diagnosis(&CodeFilter::new(codes));
                index_dates.retain(|m, _| !excluded.contains(m));
            }
            Self::OnOrBeforeIndex { codes, .. } => {
                let index = matching_dates(store, codes);
                index_dates.retain(|m, date| !index.any_on_or_before(m, *date));
            }
            Self::ExcludedConditions { conditions } => {
                let mut excluded: BTreeSet<MemberId> = BTreeSet::new();
                for (key, codes) in conditions {
                    let members = store.members_with_diagnosis(&CodeFilter::new(codes));
                    debug!(condition = %key, members = members.len(), "Excluded condition members");
                    excluded.extend(members);
                }
                index_dates.retain(|m, _| !excluded.contains(m));
            }
        }
        index_dates
    }
}

fn matching_dates(store: &dyn ClaimsQueryable, codes: &[String]) -> MemberDateIndex {
    let filter = CodeFilter::new(codes);
    if filter.is_empty() {
        return MemberDateIndex::new();
    }
    MemberDateIndex::from_events(store.diagnosis_claims(&filter, None).iter())
}

/// An ordered list of exclusion rules.
///
/// # Example
///
/// ```ignore
/// let cascade = ExclusionCascade::new()
///     .with_rule(ExclusionRule::Presence {
///         key: "gdm_codes".to_string(),
///         codes: vec!["O24.4*".to_string()],
///     });
/// let kept = cascade.apply(&store, index_dates);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionCascade {
    rules: Vec<ExclusionRule>,
}

impl ExclusionCascade {
    /// Creates an empty cascade.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a rule.
    pub fn with_rule(mut self, rule: ExclusionRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Appends a rule in place.
    pub fn push(&mut self, rule: ExclusionRule) {
        self.rules.push(rule);
    }

    /// Returns the rules in application order.
    pub fn rules(&self) -> &[ExclusionRule] {
        &self.rules
    }

    /// Returns the number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns true if the cascade has no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Applies every rule in order.
    pub fn apply(&self, store: &dyn ClaimsQueryable, mut index_dates: IndexDates) -> IndexDates {
        for rule in &self.rules {
            let before = index_dates.len();
            index_dates = rule.apply(store, index_dates);
            info!(
                rule = %rule.label(),
                removed = before - index_dates.len(),
                remaining = index_dates.len(),
                "Applied exclusion"
            );
        }
        index_dates
    }
}

/// Drops candidate claims preceded by a matching claim within `months`
/// calendar months.
///
/// A candidate claim on date `t` is dropped when the member has a matching
/// claim on `d` with `t - months <= d < t`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookbackRule {
    /// Key the rule was built from.
    pub key: String,
    /// Code patterns of the disqualifying history.
    pub codes: Vec<String>,
    /// Lookback length in calendar months.
    pub months: u32,
}

impl LookbackRule {
    /// Filters inclusion claims.
    pub fn apply(&self, store: &dyn ClaimsQueryable, claims: Vec<Claim>) -> Vec<Claim> {
        if claims.is_empty() {
            return claims;
        }
        let index = matching_dates(store, &self.codes);
        let before = claims.len();

        let kept: Vec<Claim> = claims
            .into_iter()
            .filter(|claim| {
                let start = lookback_start(claim.date_of_service, self.months);
                !index.any_in_range_before(&claim.member_id, start, claim.date_of_service)
            })
            .collect();

        info!(
            rule = %self.key,
            months = self.months,
            removed = before - kept.len(),
            "Applied lookback"
        );
        kept
    }
}

fn lookback_start(date: NaiveDate, months: u32) -> NaiveDate {
    date.checked_sub_months(Months::new(months))
        .unwrap_or(NaiveDate::MIN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cohort_types::{ClaimType, DrugClaim, Member, ProcedureClaim};

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn claim(member: &str, date: &str, code: &str) -> Claim {
        Claim {
            claim_entry_id: format!("{member}-{date}-{code}"),
            member_id: member.to_string(),
            date_of_service: d(date),
            diagnosis_code: code.to_string(),
            claim_type: ClaimType::Medical,
        }
    }

    struct Store(Vec<Claim>);

    impl ClaimsQueryable for Store {
        fn diagnosis_claims(&self, filter: &CodeFilter, _: Option<&[ClaimType]>) -> Vec<Claim> {
            self.0
                .iter()
                .filter(|c| filter.matches(&c.diagnosis_code))
                .cloned()
                .collect()
        }

        fn procedure_claims(&self, _: &CodeFilter) -> Vec<ProcedureClaim> {
            Vec::new()
        }

        fn drug_claims(&self, _: &CodeFilter) -> Vec<DrugClaim> {
            Vec::new()
        }

        fn member(&self, _: &str) -> Option<&Member> {
            None
        }

        fn demographic_columns(&self) -> &[String] {
            &[]
        }
    }

    fn index_dates(entries: &[(&str, &str)]) -> IndexDates {
        entries
            .iter()
            .map(|(m, date)| (m.to_string(), d(date)))
            .collect()
    }

    fn codes(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_within_window_removes_nearby_claims() {
        let store = Store(vec![
            claim("M2", "2023-06-10", "K50.0"),
            claim("M3", "2024-01-01", "K50.0"),
        ]);
        let rule = ExclusionRule::WithinWindow {
            key: "organic_gi".to_string(),
            codes: codes(&["K50.*"]),
            window_days: 30,
        };

        let kept = rule.apply(
            &store,
            index_dates(&[("M2", "2023-06-01"), ("M3", "2023-06-01")]),
        );
        assert!(!kept.contains_key("M2"));
        assert!(kept.contains_key("M3"));
    }

    #[test]
    fn test_presence_ignores_timing() {
        let store = Store(vec![claim("M1", "2010-01-01", "O24.4")]);
        let rule = ExclusionRule::Presence {
            key: "gdm_codes".to_string(),
            codes: codes(&["O24.4*"]),
        };
        let kept = rule.apply(&store, index_dates(&[("M1", "2023-06-01"), ("M2", "2023-06-01")]));
        assert_eq!(kept.keys().collect::<Vec<_>>(), ["M2"]);
    }

    #[test]
    fn test_on_or_before_index() {
        let store = Store(vec![
            claim("M1", "2023-06-01", "E11.9"),
            claim("M2", "2023-06-02", "E11.9"),
        ]);
        let rule = ExclusionRule::OnOrBeforeIndex {
            key: "diabetes_codes".to_string(),
            codes: codes(&["E11.*"]),
        };
        let kept = rule.apply(&store, index_dates(&[("M1", "2023-06-01"), ("M2", "2023-06-01")]));
        assert_eq!(kept.keys().collect::<Vec<_>>(), ["M2"]);
    }

    #[test]
    fn test_excluded_conditions_unions_categories() {
        let store = Store(vec![
            claim("M1", "2023-01-01", "E24.0"),
            claim("M2", "2023-01-01", "B20"),
        ]);
        let rule = ExclusionRule::ExcludedConditions {
            conditions: vec![
                ("cushing".to_string(), codes(&["E24.*"])),
                ("hiv".to_string(), codes(&["B20"])),
            ],
        };
        let kept = rule.apply(
            &store,
            index_dates(&[("M1", "2023-06-01"), ("M2", "2023-06-01"), ("M3", "2023-06-01")]),
        );
        assert_eq!(kept.keys().collect::<Vec<_>>(), ["M3"]);
        assert_eq!(rule.label(), "excluded conditions [cushing, hiv]");
    }

    #[test]
    fn test_cascade_is_monotonic() {
        let store = Store(vec![
            claim("M1", "2023-06-05", "A"),
            claim("M2", "2020-01-01", "B"),
            claim("M3", "2023-01-01", "C"),
        ]);
        let cascade = ExclusionCascade::new()
            .with_rule(ExclusionRule::WithinWindow {
                key: "a".to_string(),
                codes: codes(&["A"]),
                window_days: 10,
            })
            .with_rule(ExclusionRule::Presence {
                key: "b".to_string(),
                codes: codes(&["B"]),
            })
            .with_rule(ExclusionRule::Presence {
                key: "none".to_string(),
                codes: Vec::new(),
            });

        let before = index_dates(&[
            ("M1", "2023-06-01"),
            ("M2", "2023-06-01"),
            ("M3", "2023-06-01"),
            ("M4", "2023-06-01"),
        ]);
        let after = cascade.apply(&store, before.clone());

        assert!(after.len() <= before.len());
        assert!(after.keys().all(|m| before.contains_key(m)));
        assert_eq!(after.keys().collect::<Vec<_>>(), ["M3", "M4"]);
    }

    #[test]
    fn test_lookback_drops_claims_with_recent_history() {
        let store = Store(vec![claim("M1", "2023-01-15", "E11.9"), claim("M2", "2021-01-01", "E11.9")]);
        let rule = LookbackRule {
            key: "lookback_no_diabetes".to_string(),
            codes: codes(&["E11.*"]),
            months: 12,
        };
        let candidates = vec![
            claim("M1", "2023-06-01", "R73.03"),
            claim("M1", "2023-01-15", "R73.03"),
            claim("M2", "2023-06-01", "R73.03"),
        ];

        let kept = rule.apply(&store, candidates);
        let kept: Vec<_> = kept
            .iter()
            .map(|c| (c.member_id.as_str(), c.date_of_service))
            .collect();
        // Same-day history is not "prior"; M2's history is older than 12 months
        assert_eq!(
            kept,
            vec![("M1", d("2023-01-15")), ("M2", d("2023-06-01"))]
        );
    }

    #[test]
    fn test_lookback_start_clamps_month_end() {
        assert_eq!(lookback_start(d("2024-03-31"), 1), d("2024-02-29"));
        assert_eq!(lookback_start(d("2024-03-31"), 12), d("2023-03-31"));
    }
}
