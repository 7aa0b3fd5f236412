use crate::auth::auth::AuthUser;
use crate::error::ApiError;
use crate::model::vacation_request::RequestStatus;
use crate::workflow::stats::{
    AccountRecord, AccountUsage, MonthlyCount, RequestRecord, StatusCounts, account_leaderboard,
    mean_decision_hours, monthly_counts, status_counts,
};
use actix_web::{HttpResponse, Responder, web};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{MySqlPool, prelude::FromRow};
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct StatsSummaryResponse {
    pub counts: StatusCounts,
    /// Mean hours between creation and decision; null until something
    /// has been decided
    #[schema(example = 36.5)]
    pub mean_decision_hours: Option<f64>,
    /// Trailing 12 months of request creation, oldest first
    pub monthly: Vec<MonthlyCount>,
    /// Accounts by request count, busiest first
    pub leaderboard: Vec<AccountUsage>,
}

#[derive(FromRow)]
struct RequestStatRow {
    account_id: u64,
    status: RequestStatus,
    created_at: DateTime<Utc>,
    decided_at: Option<DateTime<Utc>>,
}

#[derive(FromRow)]
struct AccountStatRow {
    id: u64,
    name: String,
    total_days: u32,
    used_days: u32,
}

/// Aggregate statistics over all accounts and requests (manager)
#[utoipa::path(
    get,
    path = "/api/v1/stats/summary",
    responses(
        (status = 200, description = "Aggregate statistics", body = StatsSummaryResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Manager only")
    ),
    security(("bearer_auth" = [])),
    tag = "Stats"
)]
pub async fn summary(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> Result<impl Responder, ApiError> {
    auth.require_manager()?;

    let request_rows = sqlx::query_as::<_, RequestStatRow>(
        r#"
        SELECT account_id, status, created_at, decided_at
        FROM vacation_requests
        "#,
    )
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "Failed to fetch request statistics");
        ApiError::from(e)
    })?;

    let account_rows = sqlx::query_as::<_, AccountStatRow>(
        r#"
        SELECT id, CONCAT(first_name, ' ', last_name) AS name, total_days, used_days
        FROM accounts
        "#,
    )
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "Failed to fetch account statistics");
        ApiError::from(e)
    })?;

    let records: Vec<RequestRecord> = request_rows
        .into_iter()
        .map(|r| RequestRecord {
            account_id: r.account_id,
            status: r.status,
            created_at: r.created_at,
            decided_at: r.decided_at,
        })
        .collect();

    let accounts: Vec<AccountRecord> = account_rows
        .into_iter()
        .map(|a| AccountRecord {
            id: a.id,
            name: a.name,
            total_days: a.total_days,
            used_days: a.used_days,
        })
        .collect();

    let response = StatsSummaryResponse {
        counts: status_counts(&records),
        mean_decision_hours: mean_decision_hours(&records),
        monthly: monthly_counts(&records, Utc::now()),
        leaderboard: account_leaderboard(&accounts, &records),
    };

    Ok(HttpResponse::Ok().json(response))
}
