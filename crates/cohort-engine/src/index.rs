//! In-memory member-to-dates index.
//!
//! Exclusion and support checks fetch their matching claims once and then
//! answer every per-member question from this index.

use std::collections::HashMap;

use chrono::{Duration, NaiveDate};
use cohort_types::{MemberId, ServiceEvent};

/// Sorted service dates per member.
///
/// # Example
///
/// ```rust
/// use chrono::NaiveDate;
/// use cohort_engine::MemberDateIndex;
///
/// let d = |m, day| NaiveDate::from_ymd_opt(2023, m, day).unwrap();
/// let index = MemberDateIndex::from_dates([
///     ("M1".to_string(), d(6, 10)),
///     ("M1".to_string(), d(1, 2)),
/// ]);
///
/// assert!(index.any_within("M1", d(6, 1), 30));
/// assert!(!index.any_within("M1", d(3, 1), 30));
/// assert!(!index.contains("M2"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemberDateIndex {
    dates: HashMap<MemberId, Vec<NaiveDate>>,
}

impl MemberDateIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an index from claims or other service events.
    pub fn from_events<'a, E, I>(events: I) -> Self
    where
        E: ServiceEvent + 'a,
        I: IntoIterator<Item = &'a E>,
    {
        Self::from_dates(
            events
                .into_iter()
                .map(|e| (e.member_id().to_string(), e.date_of_service())),
        )
    }

    /// Builds an index from `(member, date)` pairs.
    pub fn from_dates<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (MemberId, NaiveDate)>,
    {
        let mut dates: HashMap<MemberId, Vec<NaiveDate>> = HashMap::new();
        for (member, date) in pairs {
            dates.entry(member).or_default().push(date);
        }
        for list in dates.values_mut() {
            list.sort_unstable();
        }
        Self { dates }
    }

    /// Returns true if the member has any date at all.
    pub fn contains(&self, member: &str) -> bool {
        self.dates.contains_key(member)
    }

    /// Returns the member's sorted dates.
    pub fn dates(&self, member: &str) -> &[NaiveDate] {
        self.dates.get(member).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Returns the number of indexed members.
    pub fn member_count(&self) -> usize {
        self.dates.len()
    }

    /// Iterates over indexed members in no particular order.
    pub fn members(&self) -> impl Iterator<Item = &str> {
        self.dates.keys().map(String::as_str)
    }

    /// Any date in `[start, end]`, both inclusive.
    pub fn any_between(&self, member: &str, start: NaiveDate, end: NaiveDate) -> bool {
        if start > end {
            return false;
        }
        let dates = self.dates(member);
        let first = dates.partition_point(|d| *d < start);
        dates.get(first).is_some_and(|d| *d <= end)
    }

    /// Any date within `days` either side of `center`.
    pub fn any_within(&self, member: &str, center: NaiveDate, days: i64) -> bool {
        self.any_between(member, shift_days(center, -days), shift_days(center, days))
    }

    /// Any date in the trailing window `[end - days, end]`.
    pub fn any_trailing(&self, member: &str, end: NaiveDate, days: i64) -> bool {
        self.any_between(member, shift_days(end, -days), end)
    }

    /// Any date on or before `date`.
    pub fn any_on_or_before(&self, member: &str, date: NaiveDate) -> bool {
        self.dates(member).first().is_some_and(|d| *d <= date)
    }

    /// Any date in `[start, before)`.
    pub fn any_in_range_before(&self, member: &str, start: NaiveDate, before: NaiveDate) -> bool {
        let dates = self.dates(member);
        let first = dates.partition_point(|d| *d < start);
        dates.get(first).is_some_and(|d| *d < before)
    }
}

/// `date` moved by `days`, saturating at the representable date range.
pub(crate) fn shift_days(date: NaiveDate, days: i64) -> NaiveDate {
    let shifted = Duration::try_days(days).and_then(|span| date.checked_add_signed(span));
    match shifted {
        Some(shifted) => shifted,
        None if days < 0 => NaiveDate::MIN,
        None => NaiveDate::MAX,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn index() -> MemberDateIndex {
        MemberDateIndex::from_dates([
            ("M1".to_string(), d(2023, 6, 10)),
            ("M1".to_string(), d(2023, 1, 5)),
            ("M2".to_string(), d(2024, 1, 1)),
        ])
    }

    #[test]
    fn test_dates_are_sorted() {
        let index = index();
        assert_eq!(index.dates("M1"), &[d(2023, 1, 5), d(2023, 6, 10)]);
        assert!(index.dates("M9").is_empty());
        assert_eq!(index.member_count(), 2);
    }

    #[test]
    fn test_any_within_is_inclusive() {
        let index = index();
        assert!(index.any_within("M1", d(2023, 6, 1), 9));
        assert!(!index.any_within("M1", d(2023, 6, 1), 8));
        assert!(index.any_within("M1", d(2023, 7, 10), 30));
        assert!(!index.any_within("M2", d(2023, 6, 1), 30));
    }

    #[test]
    fn test_any_trailing_looks_back_only() {
        let index = index();
        assert!(index.any_trailing("M1", d(2023, 6, 10), 0));
        assert!(index.any_trailing("M1", d(2023, 7, 1), 180));
        assert!(!index.any_trailing("M1", d(2023, 6, 9), 100));
    }

    #[test]
    fn test_any_on_or_before() {
        let index = index();
        assert!(index.any_on_or_before("M1", d(2023, 1, 5)));
        assert!(!index.any_on_or_before("M1", d(2023, 1, 4)));
        assert!(!index.any_on_or_before("M3", d(2099, 1, 1)));
    }

    #[test]
    fn test_any_in_range_before_excludes_end() {
        let index = index();
        assert!(index.any_in_range_before("M1", d(2023, 1, 1), d(2023, 1, 6)));
        assert!(!index.any_in_range_before("M1", d(2023, 1, 1), d(2023, 1, 5)));
        assert!(!index.any_in_range_before("M1", d(2023, 1, 6), d(2023, 6, 10)));
    }

    #[test]
    fn test_huge_windows_saturate() {
        let index = index();
        assert!(index.any_within("M1", d(2023, 6, 1), i64::MAX));
        assert!(index.any_within("M2", d(2023, 6, 1), 1_000_000_000));
        assert!(index.any_trailing("M1", d(2023, 6, 10), i64::MAX));
        assert_eq!(shift_days(d(2023, 1, 1), i64::MIN), NaiveDate::MIN);
        assert_eq!(shift_days(d(2023, 1, 1), 1_000_000_000), NaiveDate::MAX);
        assert_eq!(shift_days(d(2023, 1, 1), 31), d(2023, 2, 1));
    }
}
