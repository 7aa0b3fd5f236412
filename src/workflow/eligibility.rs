//! Admissibility checks for a candidate date range: overlap against the
//! account's live requests and remaining-balance sufficiency.

use chrono::NaiveDate;

/// A request's date range as fetched for the overlap check. Only `pending`
/// and `approved` requests belong in the comparison set.
#[derive(Debug, Clone)]
pub struct DateSpan {
    pub id: u64,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Inclusive day count of a range; a single-day request has duration 1.
pub fn duration_days(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days() + 1
}

/// Two inclusive ranges overlap iff `s1 <= e2 && s2 <= e1`. Containment,
/// partial overlap, and exact match are all covered by the same test.
pub fn spans_overlap(s1: NaiveDate, e1: NaiveDate, s2: NaiveDate, e2: NaiveDate) -> bool {
    s1 <= e2 && s2 <= e1
}

/// Returns the id of the first live span overlapping the candidate range,
/// skipping `exclude` (the candidate's own id when re-validating an edit).
pub fn find_conflict(
    start: NaiveDate,
    end: NaiveDate,
    active: &[DateSpan],
    exclude: Option<u64>,
) -> Option<u64> {
    active
        .iter()
        .filter(|span| Some(span.id) != exclude)
        .find(|span| spans_overlap(start, end, span.start, span.end))
        .map(|span| span.id)
}

/// Balance gate against the pre-transition counters: admissible iff
/// `needed <= total - used`.
pub fn balance_allows(total: u32, used: u32, needed: i64) -> bool {
    needed <= total as i64 - used as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn span(id: u64, start: &str, end: &str) -> DateSpan {
        DateSpan {
            id,
            start: d(start),
            end: d(end),
        }
    }

    #[test]
    fn single_day_has_duration_one() {
        assert_eq!(duration_days(d("2025-01-10"), d("2025-01-10")), 1);
        assert_eq!(duration_days(d("2025-01-10"), d("2025-01-14")), 5);
    }

    #[test]
    fn overlap_covers_partial_containment_and_exact() {
        // partial
        assert!(spans_overlap(
            d("2025-01-01"),
            d("2025-01-05"),
            d("2025-01-05"),
            d("2025-01-08")
        ));
        // containment
        assert!(spans_overlap(
            d("2025-01-01"),
            d("2025-01-10"),
            d("2025-01-03"),
            d("2025-01-04")
        ));
        // exact match
        assert!(spans_overlap(
            d("2025-01-01"),
            d("2025-01-05"),
            d("2025-01-01"),
            d("2025-01-05")
        ));
        // disjoint, adjacent days do not share a date
        assert!(!spans_overlap(
            d("2025-01-01"),
            d("2025-01-05"),
            d("2025-01-06"),
            d("2025-01-08")
        ));
    }

    #[test]
    fn conflict_search_skips_excluded_id() {
        let active = vec![span(1, "2025-01-10", "2025-01-14"), span(2, "2025-02-01", "2025-02-03")];

        assert_eq!(
            find_conflict(d("2025-01-12"), d("2025-01-13"), &active, None),
            Some(1)
        );
        // editing request 1 against its own dates is not a conflict
        assert_eq!(
            find_conflict(d("2025-01-12"), d("2025-01-13"), &active, Some(1)),
            None
        );
        assert_eq!(
            find_conflict(d("2025-03-01"), d("2025-03-05"), &active, None),
            None
        );
    }

    #[test]
    fn balance_admits_exact_remainder_and_refuses_one_more() {
        // total 20, used 5 -> remaining 15
        assert!(balance_allows(20, 5, 15));
        assert!(!balance_allows(20, 5, 16));
        assert!(balance_allows(20, 20, 0));
        assert!(!balance_allows(20, 20, 1));
    }
}
