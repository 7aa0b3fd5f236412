//! The request state machine, reified as a single transition function.
//!
//! `pending` is the only live state; `approved` and `rejected` are terminal.
//! Every status mutation in the handlers goes through `decide` or
//! `ensure_pending` rather than ad-hoc status comparisons.

use crate::error::ApiError;
use crate::model::vacation_request::RequestStatus;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum DecisionAction {
    Approve,
    Reject,
}

/// Outcome of a decision: the next status plus the ledger delta the caller
/// must apply to `used_days` in the same transaction.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Transition {
    pub next: RequestStatus,
    pub balance_delta: i64,
}

/// Validates the current state and computes the transition for a manager
/// decision. Approval consumes the request's duration from the balance;
/// rejection consumes nothing. The balance itself is validated at
/// create/edit time, not re-checked here; the `valid_vacation_days`
/// constraint in the store is the last-line defense.
pub fn decide(
    current: RequestStatus,
    action: DecisionAction,
    duration: i64,
) -> Result<Transition, ApiError> {
    if current != RequestStatus::Pending {
        return Err(ApiError::Conflict(format!(
            "only pending requests can be decided (current status: {})",
            current
        )));
    }

    Ok(match action {
        DecisionAction::Approve => Transition {
            next: RequestStatus::Approved,
            balance_delta: duration,
        },
        DecisionAction::Reject => Transition {
            next: RequestStatus::Rejected,
            balance_delta: 0,
        },
    })
}

/// Guard for edit and delete: both are allowed only while the request is
/// still pending.
pub fn ensure_pending(current: RequestStatus) -> Result<(), ApiError> {
    if current != RequestStatus::Pending {
        return Err(ApiError::Conflict(format!(
            "only pending requests can be modified (current status: {})",
            current
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn approve_carries_duration_as_ledger_delta() {
        let t = decide(RequestStatus::Pending, DecisionAction::Approve, 5).unwrap();
        assert_eq!(t.next, RequestStatus::Approved);
        assert_eq!(t.balance_delta, 5);
    }

    #[test]
    fn reject_carries_no_ledger_delta() {
        let t = decide(RequestStatus::Pending, DecisionAction::Reject, 5).unwrap();
        assert_eq!(t.next, RequestStatus::Rejected);
        assert_eq!(t.balance_delta, 0);
    }

    #[test]
    fn deciding_a_decided_request_is_a_conflict_not_a_noop() {
        for current in [RequestStatus::Approved, RequestStatus::Rejected] {
            for action in [DecisionAction::Approve, DecisionAction::Reject] {
                let err = decide(current, action, 3).unwrap_err();
                assert!(matches!(err, ApiError::Conflict(_)));
            }
        }
    }

    #[test]
    fn terminal_requests_cannot_be_modified() {
        assert!(ensure_pending(RequestStatus::Pending).is_ok());
        assert!(matches!(
            ensure_pending(RequestStatus::Approved),
            Err(ApiError::Conflict(_))
        ));
        assert!(matches!(
            ensure_pending(RequestStatus::Rejected),
            Err(ApiError::Conflict(_))
        ));
    }
}
