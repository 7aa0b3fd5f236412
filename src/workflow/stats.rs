//! Read-side aggregations for the stats endpoint. Pure functions over rows
//! the handler has already fetched, so the arithmetic is testable without a
//! database.

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::model::vacation_request::RequestStatus;

/// Minimal request projection the aggregations need.
#[derive(Debug, Clone)]
pub struct RequestRecord {
    pub account_id: u64,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
}

/// Minimal account projection for utilization and the leaderboard.
#[derive(Debug, Clone)]
pub struct AccountRecord {
    pub id: u64,
    pub name: String,
    pub total_days: u32,
    pub used_days: u32,
}

#[derive(Debug, Serialize, ToSchema, PartialEq, Eq)]
pub struct StatusCounts {
    #[schema(example = 3)]
    pub pending: i64,
    #[schema(example = 10)]
    pub approved: i64,
    #[schema(example = 2)]
    pub rejected: i64,
    #[schema(example = 15)]
    pub total: i64,
}

#[derive(Debug, Serialize, ToSchema, PartialEq, Eq)]
pub struct MonthlyCount {
    /// Creation month, `YYYY-MM`
    #[schema(example = "2025-06")]
    pub month: String,
    #[schema(example = 4)]
    pub count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AccountUsage {
    #[schema(example = 1)]
    pub account_id: u64,
    #[schema(example = "John Doe")]
    pub name: String,
    #[schema(example = 20)]
    pub total_days: u32,
    #[schema(example = 5)]
    pub used_days: u32,
    /// `used_days / total_days`, 0.0 for a zero entitlement
    #[schema(example = 0.25)]
    pub utilization: f64,
    #[schema(example = 7)]
    pub request_count: i64,
}

pub fn status_counts(records: &[RequestRecord]) -> StatusCounts {
    let mut counts = StatusCounts {
        pending: 0,
        approved: 0,
        rejected: 0,
        total: records.len() as i64,
    };
    for r in records {
        match r.status {
            RequestStatus::Pending => counts.pending += 1,
            RequestStatus::Approved => counts.approved += 1,
            RequestStatus::Rejected => counts.rejected += 1,
        }
    }
    counts
}

/// Mean `decided_at - created_at` in hours over decided requests only.
/// Requests still pending are excluded, not counted as zero; `None` when
/// nothing has been decided yet.
pub fn mean_decision_hours(records: &[RequestRecord]) -> Option<f64> {
    let latencies: Vec<f64> = records
        .iter()
        .filter_map(|r| r.decided_at.map(|d| (d - r.created_at).num_seconds() as f64 / 3600.0))
        .collect();

    if latencies.is_empty() {
        return None;
    }
    Some(latencies.iter().sum::<f64>() / latencies.len() as f64)
}

fn months_back(year: i32, month: u32, k: u32) -> (i32, u32) {
    let idx = year * 12 + (month as i32 - 1) - k as i32;
    (idx.div_euclid(12), idx.rem_euclid(12) as u32 + 1)
}

/// Request counts keyed by creation month for the trailing 12-month window
/// ending at `now`, oldest month first, zero-filled.
pub fn monthly_counts(records: &[RequestRecord], now: DateTime<Utc>) -> Vec<MonthlyCount> {
    (0..12)
        .rev()
        .map(|k| {
            let (year, month) = months_back(now.year(), now.month(), k);
            let count = records
                .iter()
                .filter(|r| r.created_at.year() == year && r.created_at.month() == month)
                .count() as i64;
            MonthlyCount {
                month: format!("{:04}-{:02}", year, month),
                count,
            }
        })
        .collect()
}

/// Accounts ranked by total request count, ties broken by account id so the
/// ordering is deterministic.
pub fn account_leaderboard(
    accounts: &[AccountRecord],
    records: &[RequestRecord],
) -> Vec<AccountUsage> {
    let mut rows: Vec<AccountUsage> = accounts
        .iter()
        .map(|a| {
            let request_count =
                records.iter().filter(|r| r.account_id == a.id).count() as i64;
            let utilization = if a.total_days == 0 {
                0.0
            } else {
                a.used_days as f64 / a.total_days as f64
            };
            AccountUsage {
                account_id: a.id,
                name: a.name.clone(),
                total_days: a.total_days,
                used_days: a.used_days,
                utilization,
                request_count,
            }
        })
        .collect();

    rows.sort_by(|a, b| {
        b.request_count
            .cmp(&a.request_count)
            .then(a.account_id.cmp(&b.account_id))
    });
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn ts(s: &str) -> DateTime<Utc> {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
            .unwrap()
            .and_utc()
    }

    fn record(
        account_id: u64,
        status: RequestStatus,
        created: &str,
        decided: Option<&str>,
    ) -> RequestRecord {
        RequestRecord {
            account_id,
            status,
            created_at: ts(created),
            decided_at: decided.map(ts),
        }
    }

    #[test]
    fn counts_split_by_status() {
        let records = vec![
            record(1, RequestStatus::Pending, "2025-06-01 09:00:00", None),
            record(1, RequestStatus::Approved, "2025-06-02 09:00:00", Some("2025-06-03 09:00:00")),
            record(2, RequestStatus::Rejected, "2025-06-03 09:00:00", Some("2025-06-04 09:00:00")),
            record(2, RequestStatus::Approved, "2025-06-04 09:00:00", Some("2025-06-05 09:00:00")),
        ];
        assert_eq!(
            status_counts(&records),
            StatusCounts {
                pending: 1,
                approved: 2,
                rejected: 1,
                total: 4
            }
        );
    }

    #[test]
    fn undecided_requests_do_not_drag_latency_to_zero() {
        let records = vec![
            // decided after 24h
            record(1, RequestStatus::Approved, "2025-06-01 09:00:00", Some("2025-06-02 09:00:00")),
            // decided after 48h
            record(1, RequestStatus::Rejected, "2025-06-01 09:00:00", Some("2025-06-03 09:00:00")),
            // still pending, excluded
            record(2, RequestStatus::Pending, "2025-06-01 09:00:00", None),
        ];
        assert_eq!(mean_decision_hours(&records), Some(36.0));

        let undecided = vec![record(1, RequestStatus::Pending, "2025-06-01 09:00:00", None)];
        assert_eq!(mean_decision_hours(&undecided), None);
    }

    #[test]
    fn monthly_window_is_twelve_zero_filled_buckets() {
        let now = ts("2025-06-15 12:00:00");
        let records = vec![
            record(1, RequestStatus::Pending, "2025-06-01 09:00:00", None),
            record(1, RequestStatus::Pending, "2025-06-20 09:00:00", None),
            record(2, RequestStatus::Pending, "2024-07-05 09:00:00", None),
            // outside the window, dropped
            record(2, RequestStatus::Pending, "2024-06-30 09:00:00", None),
        ];

        let buckets = monthly_counts(&records, now);
        assert_eq!(buckets.len(), 12);
        assert_eq!(buckets[0].month, "2024-07");
        assert_eq!(buckets[0].count, 1);
        assert_eq!(buckets[11].month, "2025-06");
        assert_eq!(buckets[11].count, 2);
        // everything in between is present and zero
        assert!(buckets[1..11].iter().all(|b| b.count == 0));
    }

    #[test]
    fn window_crosses_year_boundaries() {
        let now = ts("2025-01-10 00:00:00");
        let buckets = monthly_counts(&[], now);
        assert_eq!(buckets[0].month, "2024-02");
        assert_eq!(buckets[11].month, "2025-01");
    }

    #[test]
    fn leaderboard_orders_by_count_then_id() {
        let accounts = vec![
            AccountRecord { id: 1, name: "Ann".into(), total_days: 20, used_days: 5 },
            AccountRecord { id: 2, name: "Bob".into(), total_days: 20, used_days: 0 },
            AccountRecord { id: 3, name: "Cid".into(), total_days: 0, used_days: 0 },
        ];
        let records = vec![
            record(2, RequestStatus::Pending, "2025-06-01 09:00:00", None),
            record(2, RequestStatus::Pending, "2025-06-02 09:00:00", None),
            record(1, RequestStatus::Approved, "2025-06-01 09:00:00", Some("2025-06-02 09:00:00")),
            record(3, RequestStatus::Pending, "2025-06-03 09:00:00", None),
        ];

        let board = account_leaderboard(&accounts, &records);
        assert_eq!(board[0].account_id, 2);
        // accounts 1 and 3 tie on one request each; lower id first
        assert_eq!(board[1].account_id, 1);
        assert_eq!(board[2].account_id, 3);
        assert_eq!(board[0].utilization, 0.0);
        assert_eq!(board[1].utilization, 0.25);
        // zero entitlement does not divide by zero
        assert_eq!(board[2].utilization, 0.0);
    }
}
