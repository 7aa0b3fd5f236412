//! The request lifecycle and balance-consistency engine.
//!
//! Pure decision logic, no I/O: handlers fetch a consistent snapshot inside
//! a database transaction (account row locked with `SELECT ... FOR UPDATE`),
//! call into this module, and persist the outcome in the same transaction.

pub mod eligibility;
pub mod stats;
pub mod transition;

pub use eligibility::{DateSpan, balance_allows, duration_days, find_conflict};
pub use transition::{DecisionAction, Transition, decide, ensure_pending};

#[cfg(test)]
mod tests {
    //! End-to-end walk of the engine against an in-memory request set,
    //! the way the handlers drive it.

    use super::*;
    use crate::error::ApiError;
    use crate::model::vacation_request::RequestStatus;
    use chrono::NaiveDate;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    struct Req {
        id: u64,
        start: NaiveDate,
        end: NaiveDate,
        status: RequestStatus,
    }

    fn active_spans(reqs: &[Req]) -> Vec<DateSpan> {
        reqs.iter()
            .filter(|r| !matches!(r.status, RequestStatus::Rejected))
            .map(|r| DateSpan {
                id: r.id,
                start: r.start,
                end: r.end,
            })
            .collect()
    }

    fn admit(
        start: NaiveDate,
        end: NaiveDate,
        exclude: Option<u64>,
        reqs: &[Req],
        total: u32,
        used: u32,
    ) -> Result<i64, ApiError> {
        if start > end {
            return Err(ApiError::Validation("start after end".into()));
        }
        let needed = duration_days(start, end);
        if !balance_allows(total, used, needed) {
            return Err(ApiError::Validation("insufficient balance".into()));
        }
        if find_conflict(start, end, &active_spans(reqs), exclude).is_some() {
            return Err(ApiError::Validation("overlapping range".into()));
        }
        Ok(needed)
    }

    #[test]
    fn five_day_request_is_approved_then_overlap_and_balance_are_refused() {
        let mut reqs: Vec<Req> = Vec::new();
        let total = 20u32;
        let mut used = 0u32;

        // 2025-01-10..2025-01-14 is 5 days and fits the balance
        let needed = admit(d("2025-01-10"), d("2025-01-14"), None, &reqs, total, used).unwrap();
        assert_eq!(needed, 5);
        reqs.push(Req {
            id: 1,
            start: d("2025-01-10"),
            end: d("2025-01-14"),
            status: RequestStatus::Pending,
        });

        // manager approves: status flips, ledger delta applied
        let t = decide(RequestStatus::Pending, DecisionAction::Approve, needed).unwrap();
        assert_eq!(t.next, RequestStatus::Approved);
        reqs[0].status = t.next;
        used += t.balance_delta as u32;
        assert_eq!(used, 5);

        // a contained range overlaps the approved one
        let err = admit(d("2025-01-12"), d("2025-01-13"), None, &reqs, total, used).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        // 20 days against a remaining balance of 15
        let err = admit(d("2025-02-01"), d("2025-02-20"), None, &reqs, total, used).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn pending_edit_revalidates_and_rejection_leaves_balance_alone() {
        let mut reqs = vec![Req {
            id: 7,
            start: d("2025-03-01"),
            end: d("2025-03-05"),
            status: RequestStatus::Pending,
        }];
        let total = 20u32;
        let used = 5u32;

        // widening the pending range passes because the request excludes itself
        ensure_pending(RequestStatus::Pending).unwrap();
        let needed = admit(d("2025-03-01"), d("2025-03-10"), Some(7), &reqs, total, used).unwrap();
        assert_eq!(needed, 10);
        reqs[0].end = d("2025-03-10");

        // rejection is terminal and carries no ledger delta
        let t = decide(RequestStatus::Pending, DecisionAction::Reject, needed).unwrap();
        assert_eq!(t.next, RequestStatus::Rejected);
        assert_eq!(t.balance_delta, 0);
        reqs[0].status = t.next;

        // a decided request can no longer be edited or re-decided
        assert!(matches!(
            ensure_pending(reqs[0].status),
            Err(ApiError::Conflict(_))
        ));
        assert!(matches!(
            decide(reqs[0].status, DecisionAction::Approve, needed),
            Err(ApiError::Conflict(_))
        ));
    }

    #[test]
    fn used_days_equal_sum_of_approved_durations() {
        let spans = [
            (d("2025-04-01"), d("2025-04-03")),
            (d("2025-05-10"), d("2025-05-10")),
            (d("2025-06-01"), d("2025-06-05")),
        ];
        let mut used = 0i64;
        for (start, end) in spans {
            let duration = duration_days(start, end);
            let t = decide(RequestStatus::Pending, DecisionAction::Approve, duration).unwrap();
            used += t.balance_delta;
        }
        let expected: i64 = spans.iter().map(|(s, e)| duration_days(*s, *e)).sum();
        assert_eq!(used, expected);
        assert_eq!(used, 3 + 1 + 5);
    }
}
