//! Error types shared by the workflow engine and the HTTP handlers.

use actix_web::{HttpResponse, http::StatusCode};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /// Semantically inadmissible input: bad date order, insufficient
    /// balance, overlapping range, over-long reason.
    #[error("{0}")]
    Validation(String),

    /// Operation attempted against a record not in the required state,
    /// or a write lost to a concurrent one (duplicate key, conditional
    /// update matching zero rows).
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    /// Principal's role forbids the operation, or ownership mismatch.
    #[error("{0}")]
    Authorization(String),

    #[error("database error")]
    Database(#[from] sqlx::Error),
}

impl ApiError {
    /// Machine-readable kind, stable across message wording changes.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "validation_error",
            ApiError::Conflict(_) => "conflict",
            ApiError::NotFound(_) => "not_found",
            ApiError::Authorization(_) => "authorization_error",
            ApiError::Database(_) => "internal_error",
        }
    }
}

impl actix_web::ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Authorization(_) => StatusCode::FORBIDDEN,
            ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            // sqlx details stay in the log, not the response body
            ApiError::Database(e) => {
                tracing::error!(error = %e, "database error");
                "Internal Server Error".to_string()
            }
            other => other.to_string(),
        };

        HttpResponse::build(self.status_code()).json(json!({
            "error": self.kind(),
            "message": message
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::ResponseError;

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(
            ApiError::Validation("bad".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Conflict("busy".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::NotFound("gone".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Authorization("no".into()).status_code(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn database_errors_hide_details() {
        let err = ApiError::Database(sqlx::Error::RowNotFound);
        let resp = err.error_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
