use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "account_code": "4821733",
        "first_name": "John",
        "last_name": "Doe",
        "email": "john.doe@company.com",
        "role_id": 2,
        "total_days": 20,
        "used_days": 5,
        "created_at": "2025-01-01T00:00:00Z"
    })
)]
pub struct Account {
    #[schema(example = 1)]
    pub id: u64,

    /// Unique 7-digit code assigned at creation
    #[schema(example = "4821733")]
    pub account_code: String,

    #[schema(example = "John")]
    pub first_name: String,

    #[schema(example = "Doe")]
    pub last_name: String,

    #[schema(example = "john.doe@company.com")]
    pub email: String,

    /// 1 = manager, 2 = employee
    #[schema(example = 2)]
    pub role_id: u8,

    #[schema(example = 20)]
    pub total_days: u32,

    #[schema(example = 5)]
    pub used_days: u32,

    #[schema(example = "2025-01-01T00:00:00Z", format = "date-time", value_type = String)]
    pub created_at: Option<DateTime<Utc>>,
}
