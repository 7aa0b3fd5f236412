use crate::auth::auth::AuthUser;
use crate::error::ApiError;
use crate::model::vacation_request::{RequestStatus, VacationRequest};
use crate::workflow::{
    self, DateSpan, DecisionAction, balance_allows, duration_days, find_conflict,
};
use actix_web::{HttpResponse, Responder, web};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{MySql, MySqlPool, Transaction, prelude::FromRow};
use std::str::FromStr;
use utoipa::{IntoParams, ToSchema};

pub const MAX_REASON_LEN: usize = 1000;

#[derive(Deserialize, ToSchema)]
pub struct CreateRequest {
    #[schema(example = "2025-01-10", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2025-01-14", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = "Family trip")]
    pub reason: Option<String>,
}

/// Partial edit of a pending request. Omitted fields keep their value; the
/// combined result is what gets re-validated.
#[derive(Deserialize, ToSchema)]
pub struct UpdateRequest {
    #[schema(example = "2025-01-10", format = "date", value_type = String)]
    pub start_date: Option<NaiveDate>,
    #[schema(example = "2025-01-14", format = "date", value_type = String)]
    pub end_date: Option<NaiveDate>,
    pub reason: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct DecisionBody {
    #[schema(example = "Enjoy!")]
    pub note: Option<String>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct RequestFilter {
    /// Filter by status (pending | approved | rejected)
    #[schema(example = "pending")]
    pub status: Option<String>,
    /// Case-insensitive substring match on requester name OR reason
    #[schema(example = "conference")]
    pub search: Option<String>,
    /// Filter by account (managers only; employees always see their own)
    #[schema(example = 123)]
    pub account_id: Option<u64>,
    /// Keep only requests ending on or after this date
    #[schema(example = "2025-01-01", format = "date", value_type = String)]
    pub from: Option<NaiveDate>,
    /// Keep only requests starting on or before this date
    #[schema(example = "2025-12-31", format = "date", value_type = String)]
    pub to: Option<NaiveDate>,
    #[schema(example = 1)]
    pub page: Option<u64>,
    #[schema(example = 10)]
    pub per_page: Option<u64>,
}

// Helper enum for typed SQLx binding
enum FilterValue {
    U64(u64),
    Str(String),
    Date(NaiveDate),
}

#[derive(Serialize, Deserialize, FromRow, ToSchema)]
pub struct RequestResponse {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 1000)]
    pub account_id: u64,
    #[schema(example = "John Doe")]
    pub account_name: String,
    #[schema(example = "2025-01-10", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2025-01-14", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = 5)]
    pub duration_days: i64,
    #[schema(example = "Family trip")]
    pub reason: Option<String>,
    #[schema(example = "pending", value_type = String)]
    pub status: RequestStatus,
    #[schema(example = 2)]
    pub decided_by: Option<u64>,
    #[schema(example = "2025-01-05T10:00:00Z", format = "date-time", value_type = String)]
    pub decided_at: Option<DateTime<Utc>>,
    #[schema(example = "Enjoy!")]
    pub decision_note: Option<String>,
    #[schema(example = "2025-01-01T00:00:00Z", format = "date-time", value_type = String)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, ToSchema)]
pub struct RequestListResponse {
    pub data: Vec<RequestResponse>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 10)]
    pub per_page: u32,
    #[schema(example = 1)]
    pub total: i64,
}

const REQUEST_COLUMNS: &str = r#"
    r.id,
    r.account_id,
    CONCAT(a.first_name, ' ', a.last_name) AS account_name,
    r.start_date,
    r.end_date,
    DATEDIFF(r.end_date, r.start_date) + 1 AS duration_days,
    r.reason,
    r.status,
    r.decided_by,
    r.decided_at,
    r.decision_note,
    r.created_at
"#;

fn validate_range(start: NaiveDate, end: NaiveDate) -> Result<(), ApiError> {
    if start > end {
        return Err(ApiError::Validation(
            "start_date cannot be after end_date".into(),
        ));
    }
    Ok(())
}

fn validate_note(note: Option<&String>, field: &str) -> Result<(), ApiError> {
    if let Some(text) = note {
        if text.chars().count() > MAX_REASON_LEN {
            return Err(ApiError::Validation(format!(
                "{} must be at most {} characters",
                field, MAX_REASON_LEN
            )));
        }
    }
    Ok(())
}

#[derive(FromRow)]
struct BalanceRow {
    total_days: u32,
    used_days: u32,
}

/// Locks the account row for the remainder of the transaction. Every
/// mutation that checks eligibility goes through this lock, so the
/// check-then-write sequence is serialized per account.
async fn lock_account(
    tx: &mut Transaction<'_, MySql>,
    account_id: u64,
) -> Result<BalanceRow, ApiError> {
    sqlx::query_as::<_, BalanceRow>(
        "SELECT total_days, used_days FROM accounts WHERE id = ? FOR UPDATE",
    )
    .bind(account_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or_else(|| ApiError::NotFound("Account not found".into()))
}

/// The comparison set for the overlap check: the account's live
/// (pending or approved) date ranges, read under the account lock.
async fn live_spans(
    tx: &mut Transaction<'_, MySql>,
    account_id: u64,
) -> Result<Vec<DateSpan>, ApiError> {
    let rows = sqlx::query_as::<_, (u64, NaiveDate, NaiveDate)>(
        r#"
        SELECT id, start_date, end_date
        FROM vacation_requests
        WHERE account_id = ? AND status IN ('pending', 'approved')
        "#,
    )
    .bind(account_id)
    .fetch_all(&mut **tx)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(id, start, end)| DateSpan { id, start, end })
        .collect())
}

/// Runs the eligibility checks against the locked snapshot. Returns the
/// candidate's duration in days.
fn check_admissible(
    start: NaiveDate,
    end: NaiveDate,
    balance: &BalanceRow,
    spans: &[DateSpan],
    exclude: Option<u64>,
) -> Result<i64, ApiError> {
    let needed = duration_days(start, end);

    if !balance_allows(balance.total_days, balance.used_days, needed) {
        let remaining = balance.total_days as i64 - balance.used_days as i64;
        return Err(ApiError::Validation(format!(
            "insufficient balance: {} days requested, {} remaining",
            needed, remaining
        )));
    }

    if let Some(other) = find_conflict(start, end, spans, exclude) {
        return Err(ApiError::Validation(format!(
            "dates overlap an existing request (#{})",
            other
        )));
    }

    Ok(needed)
}

async fn fetch_request_for_update(
    tx: &mut Transaction<'_, MySql>,
    request_id: u64,
) -> Result<VacationRequest, ApiError> {
    sqlx::query_as::<_, VacationRequest>(
        r#"
        SELECT id, account_id, start_date, end_date, reason, status,
               decided_by, decided_at, decision_note, created_at
        FROM vacation_requests
        WHERE id = ?
        FOR UPDATE
        "#,
    )
    .bind(request_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or_else(|| ApiError::NotFound("Request not found".into()))
}

/* =========================
Create vacation request
========================= */
#[utoipa::path(
    post,
    path = "/api/v1/requests",
    request_body(
        content = CreateRequest,
        description = "Vacation request payload",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Request submitted", body = Object, example = json!({
            "message": "Vacation request submitted",
            "id": 12,
            "status": "pending"
        })),
        (status = 400, description = "Bad date order, overlap, or insufficient balance"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Employee only")
    ),
    security(("bearer_auth" = [])),
    tag = "Request"
)]
pub async fn create_request(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateRequest>,
) -> Result<impl Responder, ApiError> {
    auth.require_employee()?;

    validate_range(payload.start_date, payload.end_date)?;
    validate_note(payload.reason.as_ref(), "reason")?;

    let mut tx = pool.begin().await?;

    let balance = lock_account(&mut tx, auth.account_id).await?;
    let spans = live_spans(&mut tx, auth.account_id).await?;

    check_admissible(payload.start_date, payload.end_date, &balance, &spans, None)?;

    let result = sqlx::query(
        r#"
        INSERT INTO vacation_requests
            (account_id, start_date, end_date, reason)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(auth.account_id)
    .bind(payload.start_date)
    .bind(payload.end_date)
    .bind(&payload.reason)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!(error = %e, account_id = auth.account_id, "Failed to create request");
        ApiError::from(e)
    })?;

    tx.commit().await?;

    Ok(HttpResponse::Created().json(serde_json::json!({
        "message": "Vacation request submitted",
        "id": result.last_insert_id(),
        "status": RequestStatus::Pending.as_str()
    })))
}

/* =========================
Edit pending request (owner)
========================= */
#[utoipa::path(
    put,
    path = "/api/v1/requests/{request_id}",
    params(
        ("request_id" = u64, Path, description = "ID of the request to edit")
    ),
    request_body = UpdateRequest,
    responses(
        (status = 200, description = "Request updated", body = Object, example = json!({
            "message": "Request updated"
        })),
        (status = 400, description = "Combined result fails validation"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Only the owner may edit"),
        (status = 404, description = "Request not found"),
        (status = 409, description = "Request already decided")
    ),
    security(("bearer_auth" = [])),
    tag = "Request"
)]
pub async fn update_request(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<UpdateRequest>,
) -> Result<impl Responder, ApiError> {
    let request_id = path.into_inner();

    validate_note(payload.reason.as_ref(), "reason")?;

    let mut tx = pool.begin().await?;

    let row = fetch_request_for_update(&mut tx, request_id).await?;

    if row.account_id != auth.account_id {
        return Err(ApiError::Authorization("Not your request".into()));
    }
    workflow::ensure_pending(row.status)?;

    // omitted fields keep their stored value; validation runs on the result
    let start_date = payload.start_date.unwrap_or(row.start_date);
    let end_date = payload.end_date.unwrap_or(row.end_date);
    let reason = payload.reason.clone().or(row.reason);

    validate_range(start_date, end_date)?;

    let balance = lock_account(&mut tx, row.account_id).await?;
    let spans = live_spans(&mut tx, row.account_id).await?;

    check_admissible(start_date, end_date, &balance, &spans, Some(row.id))?;

    let result = sqlx::query(
        r#"
        UPDATE vacation_requests
        SET start_date = ?, end_date = ?, reason = ?
        WHERE id = ?
        AND status = 'pending'
        "#,
    )
    .bind(start_date)
    .bind(end_date)
    .bind(&reason)
    .bind(request_id)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!(error = %e, request_id, "Failed to update request");
        ApiError::from(e)
    })?;

    if result.rows_affected() == 0 {
        return Err(ApiError::Conflict(
            "only pending requests can be modified".into(),
        ));
    }

    tx.commit().await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Request updated"
    })))
}

/* =========================
Delete pending request (owner or manager)
========================= */
#[utoipa::path(
    delete,
    path = "/api/v1/requests/{request_id}",
    params(
        ("request_id" = u64, Path, description = "ID of the request to delete")
    ),
    responses(
        (status = 200, description = "Request deleted", body = Object, example = json!({
            "message": "Request deleted"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not your request"),
        (status = 404, description = "Request not found"),
        (status = 409, description = "Request already decided")
    ),
    security(("bearer_auth" = [])),
    tag = "Request"
)]
pub async fn delete_request(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<impl Responder, ApiError> {
    let request_id = path.into_inner();

    let mut tx = pool.begin().await?;

    let row = fetch_request_for_update(&mut tx, request_id).await?;

    auth.require_owner_or_manager(row.account_id)?;
    workflow::ensure_pending(row.status)?;

    // nothing was ever added to the ledger while pending
    let result = sqlx::query("DELETE FROM vacation_requests WHERE id = ? AND status = 'pending'")
        .bind(request_id)
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::Conflict(
            "only pending requests can be modified".into(),
        ));
    }

    tx.commit().await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Request deleted"
    })))
}

async fn decide_request(
    auth: &AuthUser,
    pool: &MySqlPool,
    request_id: u64,
    action: DecisionAction,
    note: Option<String>,
) -> Result<HttpResponse, ApiError> {
    auth.require_manager()?;
    validate_note(note.as_ref(), "note")?;

    let mut tx = pool.begin().await?;

    let row = fetch_request_for_update(&mut tx, request_id).await?;

    let duration = duration_days(row.start_date, row.end_date);
    let transition = workflow::decide(row.status, action, duration)?;

    if transition.balance_delta != 0 {
        lock_account(&mut tx, row.account_id).await?;
    }

    let result = sqlx::query(
        r#"
        UPDATE vacation_requests
        SET status = ?, decided_by = ?, decided_at = UTC_TIMESTAMP(), decision_note = ?
        WHERE id = ?
        AND status = 'pending'
        "#,
    )
    .bind(transition.next.as_str())
    .bind(auth.account_id)
    .bind(&note)
    .bind(request_id)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!(error = %e, request_id, "Decision update failed");
        ApiError::from(e)
    })?;

    if result.rows_affected() == 0 {
        return Err(ApiError::Conflict(
            "only pending requests can be decided".into(),
        ));
    }

    if transition.balance_delta != 0 {
        // same transaction as the status flip; the valid_vacation_days
        // constraint is the storage-level backstop
        sqlx::query("UPDATE accounts SET used_days = used_days + ? WHERE id = ?")
            .bind(transition.balance_delta)
            .bind(row.account_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db_err)
                    if db_err
                        .try_downcast_ref::<sqlx::mysql::MySqlDatabaseError>()
                        .map(|m| m.number())
                        == Some(3819) =>
                {
                    ApiError::Conflict(
                        "approval would exceed the account's vacation allowance".into(),
                    )
                }
                _ => {
                    tracing::error!(error = %e, request_id, "Ledger update failed");
                    ApiError::from(e)
                }
            })?;
    }

    tx.commit().await?;

    let message = match action {
        DecisionAction::Approve => "Request approved",
        DecisionAction::Reject => "Request rejected",
    };

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": message
    })))
}

/* =========================
Approve request (manager)
========================= */
#[utoipa::path(
    put,
    path = "/api/v1/requests/{request_id}/approve",
    params(
        ("request_id" = u64, Path, description = "ID of the request to approve")
    ),
    request_body = DecisionBody,
    responses(
        (status = 200, description = "Request approved", body = Object, example = json!({
            "message": "Request approved"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Manager only"),
        (status = 404, description = "Request not found"),
        (status = 409, description = "Request already decided")
    ),
    security(("bearer_auth" = [])),
    tag = "Request"
)]
pub async fn approve_request(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: Option<web::Json<DecisionBody>>,
) -> Result<impl Responder, ApiError> {
    let note = body.and_then(|b| b.into_inner().note);
    decide_request(
        &auth,
        pool.get_ref(),
        path.into_inner(),
        DecisionAction::Approve,
        note,
    )
    .await
}

/* =========================
Reject request (manager)
========================= */
#[utoipa::path(
    put,
    path = "/api/v1/requests/{request_id}/reject",
    params(
        ("request_id" = u64, Path, description = "ID of the request to reject")
    ),
    request_body = DecisionBody,
    responses(
        (status = 200, description = "Request rejected", body = Object, example = json!({
            "message": "Request rejected"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Manager only"),
        (status = 404, description = "Request not found"),
        (status = 409, description = "Request already decided")
    ),
    security(("bearer_auth" = [])),
    tag = "Request"
)]
pub async fn reject_request(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: Option<web::Json<DecisionBody>>,
) -> Result<impl Responder, ApiError> {
    let note = body.and_then(|b| b.into_inner().note);
    decide_request(
        &auth,
        pool.get_ref(),
        path.into_inner(),
        DecisionAction::Reject,
        note,
    )
    .await
}

/* =========================
Get one request
========================= */
#[utoipa::path(
    get,
    path = "/api/v1/requests/{request_id}",
    params(
        ("request_id" = u64, Path, description = "ID of the request to fetch")
    ),
    responses(
        (status = 200, description = "Request found", body = RequestResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not your request"),
        (status = 404, description = "Request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Request"
)]
pub async fn get_request(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<impl Responder, ApiError> {
    let request_id = path.into_inner();

    let sql = format!(
        r#"
        SELECT {}
        FROM vacation_requests r
        JOIN accounts a ON a.id = r.account_id
        WHERE r.id = ?
        "#,
        REQUEST_COLUMNS
    );

    let request = sqlx::query_as::<_, RequestResponse>(&sql)
        .bind(request_id)
        .fetch_optional(pool.get_ref())
        .await?
        .ok_or_else(|| ApiError::NotFound("Request not found".into()))?;

    auth.require_owner_or_manager(request.account_id)?;

    Ok(HttpResponse::Ok().json(request))
}

/* =========================
List requests (filtered)
========================= */
#[utoipa::path(
    get,
    path = "/api/v1/requests",
    params(RequestFilter),
    responses(
        (status = 200, description = "Paginated request list", body = RequestListResponse),
        (status = 400, description = "Invalid status filter"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Request"
)]
pub async fn list_requests(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<RequestFilter>,
) -> Result<impl Responder, ApiError> {
    // -------------------------
    // Pagination
    // -------------------------
    let per_page = query.per_page.unwrap_or(10).min(100);
    let page = query.page.unwrap_or(1).max(1);
    let offset = (page - 1) * per_page;

    // -------------------------
    // WHERE clause
    // -------------------------
    let mut where_sql = String::from(" WHERE 1=1");
    let mut args: Vec<FilterValue> = Vec::new();

    // employees only ever see their own requests
    let account_scope = if auth.is_employee() {
        Some(auth.account_id)
    } else {
        query.account_id
    };

    if let Some(account_id) = account_scope {
        where_sql.push_str(" AND r.account_id = ?");
        args.push(FilterValue::U64(account_id));
    }

    if let Some(status) = query.status.as_deref() {
        let status = RequestStatus::from_str(status).map_err(|_| {
            ApiError::Validation(
                "Invalid status filter. Allowed: pending, approved, rejected".into(),
            )
        })?;
        where_sql.push_str(" AND r.status = ?");
        args.push(FilterValue::Str(status.as_str().to_string()));
    }

    // substring match on requester display name OR reason; LIKE is
    // case-insensitive under the default collation
    if let Some(search) = query.search.as_deref() {
        where_sql.push_str(
            " AND (CONCAT(a.first_name, ' ', a.last_name) LIKE ? OR r.reason LIKE ?)",
        );
        let like = format!("%{}%", search);
        args.push(FilterValue::Str(like.clone()));
        args.push(FilterValue::Str(like));
    }

    if let Some(from) = query.from {
        where_sql.push_str(" AND r.end_date >= ?");
        args.push(FilterValue::Date(from));
    }

    if let Some(to) = query.to {
        where_sql.push_str(" AND r.start_date <= ?");
        args.push(FilterValue::Date(to));
    }

    // -------------------------
    // COUNT query
    // -------------------------
    let count_sql = format!(
        "SELECT COUNT(*) FROM vacation_requests r JOIN accounts a ON a.id = r.account_id{}",
        where_sql
    );

    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
    for arg in &args {
        count_q = match arg {
            FilterValue::U64(v) => count_q.bind(*v),
            FilterValue::Str(s) => count_q.bind(s.clone()),
            FilterValue::Date(d) => count_q.bind(*d),
        };
    }

    let total = count_q.fetch_one(pool.get_ref()).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to count requests");
        ApiError::from(e)
    })?;

    // -------------------------
    // DATA query
    // -------------------------
    let data_sql = format!(
        r#"
        SELECT {}
        FROM vacation_requests r
        JOIN accounts a ON a.id = r.account_id
        {}
        ORDER BY r.created_at DESC, r.id DESC
        LIMIT ? OFFSET ?
        "#,
        REQUEST_COLUMNS, where_sql
    );

    let mut data_q = sqlx::query_as::<_, RequestResponse>(&data_sql);
    for arg in args {
        data_q = match arg {
            FilterValue::U64(v) => data_q.bind(v),
            FilterValue::Str(s) => data_q.bind(s),
            FilterValue::Date(d) => data_q.bind(d),
        };
    }

    let requests = data_q
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to fetch request list");
            ApiError::from(e)
        })?;

    // -------------------------
    // Response
    // -------------------------
    let response = RequestListResponse {
        data: requests,
        page: page as u32,
        per_page: per_page as u32,
        total,
    };

    Ok(HttpResponse::Ok().json(response))
}
