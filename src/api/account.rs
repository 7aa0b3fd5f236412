use crate::{
    auth::auth::AuthUser,
    auth::password::hash_password,
    config::Config,
    error::ApiError,
    model::{account::Account, role::Role},
    utils::db_utils::{SqlValue, build_update_sql, execute_update},
    utils::{email_cache, email_filter},
};
use actix_web::{HttpResponse, Responder, web};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{debug, error};
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, Serialize, ToSchema)]
pub struct CreateAccount {
    #[schema(example = "John")]
    pub first_name: String,
    #[schema(example = "Doe")]
    pub last_name: String,
    #[schema(example = "john.doe@company.com", format = "email")]
    pub email: String,
    pub password: String,
    /// 1 = manager, 2 = employee; fixed for the lifetime of the account
    #[schema(example = 2)]
    pub role_id: u8,
    /// Vacation entitlement; falls back to the configured default
    #[schema(example = 20)]
    pub total_days: Option<u32>,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct AccountQuery {
    #[schema(example = 1)]
    pub page: Option<u32>,
    #[schema(example = 20)]
    pub per_page: Option<u32>,
    /// Filter by role (1 = manager, 2 = employee)
    #[schema(example = 2)]
    pub role_id: Option<u8>,
    /// Search by name or email
    pub search: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct AccountListResponse {
    pub data: Vec<Account>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 42)]
    pub total: i64,
}

/// Only name, email, and password are mutable; role and balance are not.
#[derive(Deserialize, ToSchema)]
pub struct UpdateAccount {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[schema(format = "email")]
    pub email: Option<String>,
    pub password: Option<String>,
}

// Typed bind values for the dynamically assembled list filter
enum FilterValue {
    U8(u8),
    Like(String),
}

const ACCOUNT_COLUMNS: &str =
    "id, account_code, first_name, last_name, email, role_id, total_days, used_days, created_at";

/// true  => email AVAILABLE
/// false => email TAKEN
pub async fn is_email_available(email: &str, pool: &MySqlPool) -> bool {
    let email = email.to_lowercase();

    // Cuckoo filter gives a fast definite negative
    if !email_filter::might_exist(&email) {
        return true;
    }

    // Moka cache gives a fast positive
    if email_cache::is_taken(&email).await {
        return false;
    }

    // Database fallback
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM accounts WHERE email = ? LIMIT 1)",
    )
    .bind(&email)
    .fetch_one(pool)
    .await
    .unwrap_or(true); // fail-safe

    !exists
}

fn random_account_code() -> String {
    // 7 digits, no leading zero
    rand::thread_rng().gen_range(1_000_000u32..=9_999_999).to_string()
}

fn is_duplicate_key(e: &sqlx::Error, key: &str) -> bool {
    if let sqlx::Error::Database(db_err) = e {
        return db_err.code() == Some("23000".into())
            && db_err.message().contains(key);
    }
    false
}

/// Create Account (manager)
#[utoipa::path(
    post,
    path = "/api/v1/accounts",
    request_body = CreateAccount,
    responses(
        (status = 201, description = "Account created", body = Object, example = json!({
            "message": "Account created",
            "id": 7,
            "account_code": "4821733"
        })),
        (status = 400, description = "Invalid role or empty fields"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Manager only"),
        (status = 409, description = "Email already registered")
    ),
    security(("bearer_auth" = [])),
    tag = "Account"
)]
pub async fn create_account(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    payload: web::Json<CreateAccount>,
) -> Result<impl Responder, ApiError> {
    auth.require_manager()?;

    let email = payload.email.trim().to_lowercase();

    if email.is_empty() || payload.password.is_empty() || payload.first_name.trim().is_empty() {
        return Err(ApiError::Validation(
            "first_name, email and password must not be empty".into(),
        ));
    }

    if Role::from_id(payload.role_id).is_none() {
        return Err(ApiError::Validation(
            "Invalid role. Allowed: 1 (manager), 2 (employee)".into(),
        ));
    }

    if !is_email_available(&email, pool.get_ref()).await {
        return Err(ApiError::Conflict("Email already registered".into()));
    }

    let hashed = hash_password(&payload.password);
    let total_days = payload.total_days.unwrap_or(config.default_vacation_days);

    // The 7-digit code is random; retry a handful of times on collision.
    let mut attempts = 0u8;
    let (id, account_code) = loop {
        let code = random_account_code();

        let result = sqlx::query(
            r#"
            INSERT INTO accounts
            (account_code, first_name, last_name, email, password, role_id, total_days)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&code)
        .bind(payload.first_name.trim())
        .bind(payload.last_name.trim())
        .bind(&email)
        .bind(&hashed)
        .bind(payload.role_id)
        .bind(total_days)
        .execute(pool.get_ref())
        .await;

        match result {
            Ok(done) => break (done.last_insert_id(), code),
            Err(e) if is_duplicate_key(&e, "uq_accounts_code") && attempts < 5 => {
                attempts += 1;
                debug!(attempts, "Account code collision, retrying");
            }
            Err(e) if is_duplicate_key(&e, "uq_accounts_email") => {
                return Err(ApiError::Conflict("Email already registered".into()));
            }
            Err(e) => {
                error!(error = %e, "Failed to create account");
                return Err(e.into());
            }
        }
    };

    // keep the availability structures warm
    email_filter::insert(&email);
    email_cache::mark_taken(&email).await;

    Ok(HttpResponse::Created().json(json!({
        "message": "Account created",
        "id": id,
        "account_code": account_code
    })))
}

/// List Accounts (manager)
#[utoipa::path(
    get,
    path = "/api/v1/accounts",
    params(AccountQuery),
    responses(
        (status = 200, description = "Paginated account list", body = AccountListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Manager only")
    ),
    security(("bearer_auth" = [])),
    tag = "Account"
)]
pub async fn list_accounts(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<AccountQuery>,
) -> Result<impl Responder, ApiError> {
    auth.require_manager()?;

    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let offset = (page - 1) * per_page;

    // ---------- build WHERE clause dynamically ----------
    let mut conditions: Vec<&str> = Vec::new();
    let mut args: Vec<FilterValue> = Vec::new();

    if let Some(role_id) = query.role_id {
        conditions.push("role_id = ?");
        args.push(FilterValue::U8(role_id));
    }

    if let Some(search) = &query.search {
        conditions.push("(first_name LIKE ? OR last_name LIKE ? OR email LIKE ?)");
        let like = format!("%{}%", search);
        args.push(FilterValue::Like(like.clone()));
        args.push(FilterValue::Like(like.clone()));
        args.push(FilterValue::Like(like));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    // ---------- total count ----------
    let count_sql = format!("SELECT COUNT(*) FROM accounts {}", where_clause);

    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
    for arg in &args {
        count_query = match arg {
            FilterValue::U8(v) => count_query.bind(*v),
            FilterValue::Like(s) => count_query.bind(s.clone()),
        };
    }

    let total = count_query.fetch_one(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, sql = %count_sql, "Failed to count accounts");
        ApiError::from(e)
    })?;

    // ---------- data query ----------
    let data_sql = format!(
        "SELECT {} FROM accounts {} ORDER BY id DESC LIMIT ? OFFSET ?",
        ACCOUNT_COLUMNS, where_clause
    );
    debug!(sql = %data_sql, page, per_page, offset, "Fetching accounts");

    let mut data_query = sqlx::query_as::<_, Account>(&data_sql);
    for arg in args {
        data_query = match arg {
            FilterValue::U8(v) => data_query.bind(v),
            FilterValue::Like(s) => data_query.bind(s),
        };
    }
    data_query = data_query.bind(per_page as i64).bind(offset as i64);

    let accounts = data_query.fetch_all(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, sql = %data_sql, "Failed to fetch accounts");
        ApiError::from(e)
    })?;

    Ok(HttpResponse::Ok().json(AccountListResponse {
        data: accounts,
        page,
        per_page,
        total,
    }))
}

/// Get Account by ID (manager or self)
#[utoipa::path(
    get,
    path = "/api/v1/accounts/{account_id}",
    params(("account_id" = u64, Path, description = "Account ID")),
    responses(
        (status = 200, description = "Account found", body = Account),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not your record"),
        (status = 404, description = "Account not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Account"
)]
pub async fn get_account(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<impl Responder, ApiError> {
    let account_id = path.into_inner();
    auth.require_owner_or_manager(account_id)?;

    let sql = format!("SELECT {} FROM accounts WHERE id = ?", ACCOUNT_COLUMNS);
    let account = sqlx::query_as::<_, Account>(&sql)
        .bind(account_id)
        .fetch_optional(pool.get_ref())
        .await?
        .ok_or_else(|| ApiError::NotFound("Account not found".into()))?;

    Ok(HttpResponse::Ok().json(account))
}

/// Update Account (manager or self; name/email/password only)
#[utoipa::path(
    put,
    path = "/api/v1/accounts/{account_id}",
    params(("account_id" = u64, Path, description = "Account ID")),
    request_body = UpdateAccount,
    responses(
        (status = 200, description = "Account updated", body = Object, example = json!({
            "message": "Account updated"
        })),
        (status = 400, description = "No fields provided"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not your record"),
        (status = 404, description = "Account not found"),
        (status = 409, description = "Email already registered")
    ),
    security(("bearer_auth" = [])),
    tag = "Account"
)]
pub async fn update_account(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<UpdateAccount>,
) -> Result<impl Responder, ApiError> {
    let account_id = path.into_inner();
    auth.require_owner_or_manager(account_id)?;

    let mut fields: Vec<(&'static str, SqlValue)> = Vec::new();
    let mut new_email: Option<String> = None;

    if let Some(first_name) = &payload.first_name {
        fields.push(("first_name", SqlValue::String(first_name.trim().to_string())));
    }
    if let Some(last_name) = &payload.last_name {
        fields.push(("last_name", SqlValue::String(last_name.trim().to_string())));
    }
    if let Some(email) = &payload.email {
        let email = email.trim().to_lowercase();
        if email.is_empty() {
            return Err(ApiError::Validation("email must not be empty".into()));
        }
        new_email = Some(email.clone());
        fields.push(("email", SqlValue::String(email)));
    }
    if let Some(password) = &payload.password {
        if password.is_empty() {
            return Err(ApiError::Validation("password must not be empty".into()));
        }
        fields.push(("password", SqlValue::String(hash_password(password))));
    }

    // old email is needed to keep the availability structures honest
    let old_email: Option<String> = if new_email.is_some() {
        sqlx::query_scalar::<_, String>("SELECT email FROM accounts WHERE id = ?")
            .bind(account_id)
            .fetch_optional(pool.get_ref())
            .await?
    } else {
        None
    };

    let update = build_update_sql("accounts", fields, "id", account_id)?;

    let affected = execute_update(pool.get_ref(), update).await.map_err(|e| {
        if is_duplicate_key(&e, "uq_accounts_email") {
            ApiError::Conflict("Email already registered".into())
        } else {
            error!(error = %e, account_id, "Failed to update account");
            ApiError::from(e)
        }
    })?;

    if affected == 0 {
        return Err(ApiError::NotFound("Account not found".into()));
    }

    if let Some(email) = new_email {
        if let Some(old) = old_email {
            email_filter::remove(&old);
            email_cache::invalidate(&old).await;
        }
        email_filter::insert(&email);
        email_cache::mark_taken(&email).await;
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "Account updated"
    })))
}

/// Delete Account (manager); the account's requests go with it
#[utoipa::path(
    delete,
    path = "/api/v1/accounts/{account_id}",
    params(("account_id" = u64, Path, description = "Account ID")),
    responses(
        (status = 200, description = "Account deleted", body = Object, example = json!({
            "message": "Account deleted"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Manager only"),
        (status = 404, description = "Account not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Account"
)]
pub async fn delete_account(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<impl Responder, ApiError> {
    auth.require_manager()?;

    let account_id = path.into_inner();

    let email: Option<String> =
        sqlx::query_scalar::<_, String>("SELECT email FROM accounts WHERE id = ?")
            .bind(account_id)
            .fetch_optional(pool.get_ref())
            .await?;

    // FK cascade removes the account's requests and refresh tokens
    let result = sqlx::query("DELETE FROM accounts WHERE id = ?")
        .bind(account_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, account_id, "Failed to delete account");
            ApiError::from(e)
        })?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("Account not found".into()));
    }

    if let Some(email) = email {
        email_filter::remove(&email);
        email_cache::invalidate(&email).await;
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "Account deleted"
    })))
}

/// Recompute used_days from approved requests (manager).
///
/// Repair tool for pre-existing data; normal request processing keeps the
/// counter in step transactionally and never goes through this path.
#[utoipa::path(
    post,
    path = "/api/v1/accounts/{account_id}/recompute-balance",
    params(("account_id" = u64, Path, description = "Account ID")),
    responses(
        (status = 200, description = "Counter recomputed", body = Object, example = json!({
            "message": "Balance recomputed",
            "used_days": 5
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Manager only"),
        (status = 404, description = "Account not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Account"
)]
pub async fn recompute_balance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<impl Responder, ApiError> {
    auth.require_manager()?;

    let account_id = path.into_inner();

    let mut tx = pool.begin().await?;

    let exists = sqlx::query_scalar::<_, u64>("SELECT id FROM accounts WHERE id = ? FOR UPDATE")
        .bind(account_id)
        .fetch_optional(&mut *tx)
        .await?;

    if exists.is_none() {
        return Err(ApiError::NotFound("Account not found".into()));
    }

    let used_days = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COALESCE(SUM(DATEDIFF(end_date, start_date) + 1), 0)
        FROM vacation_requests
        WHERE account_id = ? AND status = 'approved'
        "#,
    )
    .bind(account_id)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("UPDATE accounts SET used_days = ? WHERE id = ?")
        .bind(used_days)
        .bind(account_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Balance recomputed",
        "used_days": used_days
    })))
}
