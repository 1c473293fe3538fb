//! Window-based index-date resolution.
//!
//! Every resolver takes claims for candidate members and returns at most one
//! index date per member. Members without a valid window are absent.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use cohort_types::{Claim, MemberId, ServiceEvent};
use tracing::debug;

use crate::criteria::WindowMode;
use crate::index::shift_days;

/// Index dates of one cohort, ordered by member.
pub type IndexDates = BTreeMap<MemberId, NaiveDate>;

/// Groups service dates by member, each list sorted ascending.
pub fn dates_by_member<E: ServiceEvent>(events: &[E]) -> BTreeMap<MemberId, Vec<NaiveDate>> {
    let mut grouped: BTreeMap<MemberId, Vec<NaiveDate>> = BTreeMap::new();
    for event in events {
        grouped
            .entry(event.member_id().to_string())
            .or_default()
            .push(event.date_of_service());
    }
    for dates in grouped.values_mut() {
        dates.sort_unstable();
    }
    grouped
}

fn gap_days(earlier: NaiveDate, later: NaiveDate) -> i64 {
    (later - earlier).num_days()
}

/// Date of the second claim of the first consecutive pair at least
/// `min_days_between` apart. `dates` must be sorted.
pub fn first_qualifying_pair(dates: &[NaiveDate], min_days_between: i64) -> Option<NaiveDate> {
    dates
        .windows(2)
        .find(|pair| gap_days(pair[0], pair[1]) >= min_days_between)
        .map(|pair| pair[1])
}

/// Date completing the earliest chain of `min_claims` claims, each at least
/// `min_days_between` after the previous chain member. `dates` must be sorted.
pub fn first_claim_chain(
    dates: &[NaiveDate],
    min_claims: usize,
    min_days_between: i64,
) -> Option<NaiveDate> {
    let mut iter = dates.iter().copied();
    let mut last = iter.next()?;
    let mut count = 1;
    if count >= min_claims {
        return Some(last);
    }
    for date in iter {
        if gap_days(last, date) >= min_days_between {
            last = date;
            count += 1;
            if count >= min_claims {
                return Some(last);
            }
        }
    }
    None
}

/// Pairwise resolver: the second claim of each member's first consecutive
/// pair whose gap is at least `min_days_between`.
///
/// Members with fewer than two claims never qualify.
///
/// # Example
///
/// ```rust
/// use chrono::NaiveDate;
/// use cohort_engine::window::resolve_pairwise;
/// use cohort_types::{Claim, ClaimType};
///
/// let claim = |date: &str| Claim {
///     claim_entry_id: date.to_string(),
///     member_id: "M1".to_string(),
///     date_of_service: date.parse().unwrap(),
///     diagnosis_code: "I10".to_string(),
///     claim_type: ClaimType::Medical,
/// };
///
/// let dates = resolve_pairwise(&[claim("2023-01-01"), claim("2023-02-01")], 30);
/// assert_eq!(dates.get("M1"), Some(&NaiveDate::from_ymd_opt(2023, 2, 1).unwrap()));
/// ```
pub fn resolve_pairwise<E: ServiceEvent>(claims: &[E], min_days_between: i64) -> IndexDates {
    dates_by_member(claims)
        .into_iter()
        .filter_map(|(member, dates)| {
            first_qualifying_pair(&dates, min_days_between).map(|date| (member, date))
        })
        .collect()
}

/// Chain resolver: the date completing each member's earliest chain of
/// `min_claims` claims spaced at least `min_days_between` apart.
pub fn resolve_claim_chain<E: ServiceEvent>(
    claims: &[E],
    min_claims: usize,
    min_days_between: i64,
) -> IndexDates {
    dates_by_member(claims)
        .into_iter()
        .filter_map(|(member, dates)| {
            first_claim_chain(&dates, min_claims, min_days_between).map(|date| (member, date))
        })
        .collect()
}

/// Resolves with the selected window mode.
pub fn resolve<E: ServiceEvent>(
    claims: &[E],
    mode: WindowMode,
    min_claims: usize,
    min_days_between: i64,
) -> IndexDates {
    match mode {
        WindowMode::Pairwise => resolve_pairwise(claims, min_days_between),
        WindowMode::NClaim => resolve_claim_chain(claims, min_claims, min_days_between),
    }
}

/// Each member's first claim date.
pub fn first_claim_dates<E: ServiceEvent>(claims: &[E]) -> IndexDates {
    let mut dates = IndexDates::new();
    for claim in claims {
        dates
            .entry(claim.member_id().to_string())
            .and_modify(|d| {
                if claim.date_of_service() < *d {
                    *d = claim.date_of_service();
                }
            })
            .or_insert(claim.date_of_service());
    }
    dates
}

/// Drops members whose first-to-last claim span exceeds `months * 30` days
/// or who have fewer than `min_claims` claims.
pub fn restrict_within_months<E: ServiceEvent>(
    index_dates: IndexDates,
    claims: &[E],
    months: i64,
    min_claims: usize,
) -> IndexDates {
    let grouped = dates_by_member(claims);
    let limit = months.saturating_mul(30);
    let before = index_dates.len();

    let kept: IndexDates = index_dates
        .into_iter()
        .filter(|(member, _)| {
            let Some(dates) = grouped.get(member) else {
                return false;
            };
            match (dates.first(), dates.last()) {
                (Some(first), Some(last)) => {
                    dates.len() >= min_claims && gap_days(*first, *last) <= limit
                }
                _ => false,
            }
        })
        .collect();

    debug!(
        months,
        before,
        after = kept.len(),
        "Applied within_months restriction"
    );
    kept
}

/// Component-window resolver.
///
/// For each member, finds the earliest claim date starting a window of
/// `window_days` (inclusive) that contains claims from at least
/// `min_components` distinct component categories. `components` pairs a
/// category label with its claims.
pub fn component_window(
    components: &[(String, Vec<Claim>)],
    min_components: usize,
    window_days: i64,
) -> IndexDates {
    let mut events: BTreeMap<&str, Vec<(NaiveDate, usize)>> = BTreeMap::new();
    for (category, (_, claims)) in components.iter().enumerate() {
        for claim in claims {
            events
                .entry(claim.member_id.as_str())
                .or_default()
                .push((claim.date_of_service, category));
        }
    }

    let mut dates = IndexDates::new();
    for (member, mut member_events) in events {
        member_events.sort_unstable();
        for (i, &(start, _)) in member_events.iter().enumerate() {
            let end = shift_days(start, window_days);
            let distinct: BTreeSet<usize> = member_events[i..]
                .iter()
                .take_while(|(date, _)| *date <= end)
                .map(|(_, category)| *category)
                .collect();
            if distinct.len() >= min_components {
                dates.insert(member.to_string(), start);
                break;
            }
        }
    }
    dates
}

/// Unions two index-date sets, keeping the earlier date for shared members.
pub fn union_earliest(mut left: IndexDates, right: IndexDates) -> IndexDates {
    for (member, date) in right {
        left.entry(member)
            .and_modify(|d| {
                if date < *d {
                    *d = date;
                }
            })
            .or_insert(date);
    }
    left
}

#[cfg(test)]
mod tests {
    use super::*;
    use cohort_types::ClaimType;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn claim(member: &str, date: &str) -> Claim {
        Claim {
            claim_entry_id: format!("{member}-{date}"),
            member_id: member.to_string(),
            date_of_service: d(date),
            diagnosis_code: "X".to_string(),
            claim_type: ClaimType::Medical,
        }
    }

    #[test]
    fn test_pairwise_second_claim_of_first_pair() {
        let claims = vec![claim("M1", "2023-01-01"), claim("M1", "2023-02-01")];
        let dates = resolve_pairwise(&claims, 30);
        assert_eq!(dates.len(), 1);
        assert_eq!(dates["M1"], d("2023-02-01"));
    }

    #[test]
    fn test_pairwise_all_gaps_below_threshold() {
        let claims = vec![
            claim("M1", "2023-01-01"),
            claim("M1", "2023-01-15"),
            claim("M1", "2023-01-20"),
        ];
        assert!(resolve_pairwise(&claims, 30).is_empty());
    }

    #[test]
    fn test_pairwise_uses_first_qualifying_pair_only() {
        // Unsorted input, two qualifying pairs
        let claims = vec![
            claim("M1", "2023-09-01"),
            claim("M1", "2023-01-01"),
            claim("M1", "2023-01-10"),
            claim("M1", "2023-03-01"),
        ];
        let dates = resolve_pairwise(&claims, 30);
        assert_eq!(dates["M1"], d("2023-03-01"));
    }

    #[test]
    fn test_pairwise_single_claim_never_qualifies() {
        let claims = vec![claim("M1", "2023-01-01")];
        assert!(resolve_pairwise(&claims, 0).is_empty());
    }

    #[test]
    fn test_claim_chain_requires_n_spaced_claims() {
        let claims = vec![
            claim("M1", "2023-01-01"),
            claim("M1", "2023-02-15"),
            claim("M1", "2023-02-20"),
            claim("M1", "2023-04-01"),
        ];
        let dates = resolve_claim_chain(&claims, 3, 30);
        assert_eq!(dates["M1"], d("2023-04-01"));

        assert!(resolve_claim_chain(&claims, 4, 30).is_empty());
        assert_eq!(resolve_claim_chain(&claims, 1, 30)["M1"], d("2023-01-01"));
    }

    #[test]
    fn test_resolve_dispatches_on_mode() {
        let claims = vec![
            claim("M1", "2023-01-01"),
            claim("M1", "2023-02-15"),
        ];
        assert_eq!(
            resolve(&claims, WindowMode::Pairwise, 3, 30)["M1"],
            d("2023-02-15")
        );
        assert!(resolve(&claims, WindowMode::NClaim, 3, 30).is_empty());
    }

    #[test]
    fn test_first_claim_dates() {
        let claims = vec![
            claim("M1", "2023-05-01"),
            claim("M1", "2023-02-01"),
            claim("M2", "2022-12-31"),
        ];
        let dates = first_claim_dates(&claims);
        assert_eq!(dates["M1"], d("2023-02-01"));
        assert_eq!(dates["M2"], d("2022-12-31"));
    }

    #[test]
    fn test_within_months_drops_long_spans() {
        let claims = vec![
            claim("M1", "2023-01-01"),
            claim("M1", "2023-03-01"),
            claim("M2", "2023-01-01"),
            claim("M2", "2023-03-01"),
            claim("M2", "2024-06-01"),
        ];
        let index = resolve_pairwise(&claims, 30);
        assert_eq!(index.len(), 2);

        let kept = restrict_within_months(index, &claims, 12, 2);
        assert!(kept.contains_key("M1"));
        assert!(!kept.contains_key("M2"));
    }

    #[test]
    fn test_within_months_enforces_min_claims() {
        let claims = vec![claim("M1", "2023-01-01"), claim("M1", "2023-03-01")];
        let index = resolve_pairwise(&claims, 30);
        assert!(restrict_within_months(index, &claims, 12, 3).is_empty());
    }

    #[test]
    fn test_component_window_counts_distinct_categories() {
        let components = vec![
            (
                "obesity".to_string(),
                vec![claim("M1", "2023-01-01"), claim("M2", "2023-01-01")],
            ),
            (
                "htn".to_string(),
                vec![claim("M1", "2023-06-01"), claim("M2", "2023-02-01")],
            ),
            (
                "lipids".to_string(),
                vec![claim("M1", "2024-03-01"), claim("M2", "2023-03-01")],
            ),
        ];

        let dates = component_window(&components, 3, 365);
        assert_eq!(dates.get("M2"), Some(&d("2023-01-01")));
        // M1's third component falls outside every 365-day window
        assert!(!dates.contains_key("M1"));

        let dates = component_window(&components, 2, 365);
        assert_eq!(dates.get("M1"), Some(&d("2023-01-01")));
    }

    #[test]
    fn test_component_window_later_start() {
        let components = vec![
            ("a".to_string(), vec![claim("M1", "2020-01-01"), claim("M1", "2023-01-01")]),
            ("b".to_string(), vec![claim("M1", "2023-02-01")]),
        ];
        let dates = component_window(&components, 2, 90);
        assert_eq!(dates["M1"], d("2023-01-01"));
    }

    #[test]
    fn test_union_earliest_keeps_earlier_date() {
        let left: IndexDates = [("M1".to_string(), d("2023-05-01"))].into_iter().collect();
        let right: IndexDates = [
            ("M1".to_string(), d("2023-02-01")),
            ("M2".to_string(), d("2023-03-01")),
        ]
        .into_iter()
        .collect();

        let merged = union_earliest(left, right);
        assert_eq!(merged["M1"], d("2023-02-01"));
        assert_eq!(merged["M2"], d("2023-03-01"));
    }
}
