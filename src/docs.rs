use crate::api::account::{AccountListResponse, AccountQuery, CreateAccount, UpdateAccount};
use crate::api::stats::StatsSummaryResponse;
use crate::api::vacation_request::{
    CreateRequest, DecisionBody, RequestFilter, RequestListResponse, RequestResponse,
    UpdateRequest,
};
use crate::auth::handlers::LoginResponse;
use crate::model::account::Account;
use crate::model::vacation_request::RequestStatus;
use crate::models::LoginReqDto;
use crate::workflow::stats::{AccountUsage, MonthlyCount, StatusCounts};
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Vacation Tracker API",
        version = "1.0.0",
        description = r#"
## Vacation Day Tracker

This API tracks per-employee vacation-day entitlement and the
request/approval workflow between employees and managers.

### 🔹 Key Features
- **Account Management**
  - Managers create, update, list, and delete accounts (role fixed at creation)
- **Request Workflow**
  - Employees submit and edit pending requests; managers approve or reject
  - Overlap and balance rules enforced before any write
- **Balance Ledger**
  - `used_days` kept in step with approved requests, transactionally
- **Statistics**
  - Status counts, decision latency, monthly volumes, per-account utilization

### 🔐 Security
Endpoints are protected using **JWT Bearer authentication**.
Decisions and account administration require the **manager** role.

### 📦 Response Format
- JSON-based RESTful responses
- Pagination supported for list endpoints

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,

        crate::api::account::create_account,
        crate::api::account::list_accounts,
        crate::api::account::get_account,
        crate::api::account::update_account,
        crate::api::account::delete_account,
        crate::api::account::recompute_balance,

        crate::api::vacation_request::create_request,
        crate::api::vacation_request::list_requests,
        crate::api::vacation_request::get_request,
        crate::api::vacation_request::update_request,
        crate::api::vacation_request::delete_request,
        crate::api::vacation_request::approve_request,
        crate::api::vacation_request::reject_request,

        crate::api::stats::summary
    ),
    components(
        schemas(
            LoginReqDto,
            LoginResponse,
            CreateAccount,
            UpdateAccount,
            AccountQuery,
            Account,
            AccountListResponse,
            CreateRequest,
            UpdateRequest,
            DecisionBody,
            RequestFilter,
            RequestResponse,
            RequestListResponse,
            RequestStatus,
            StatsSummaryResponse,
            StatusCounts,
            MonthlyCount,
            AccountUsage
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Authentication APIs"),
        (name = "Account", description = "Account management APIs"),
        (name = "Request", description = "Vacation request workflow APIs"),
        (name = "Stats", description = "Aggregate statistics APIs"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
