use crate::config::Config;
use crate::error::ApiError;
use crate::{model::role::Role, models::Claims};
use actix_web::{FromRequest, HttpRequest, dev::Payload, error::ErrorUnauthorized, web::Data};
use futures::future::{Ready, ready};
use jsonwebtoken::decode;
use jsonwebtoken::{DecodingKey, Validation};

/// The authenticated principal every protected handler receives. The engine
/// trusts this completely; credential checks happened at token issue time.
pub struct AuthUser {
    pub account_id: u64,
    pub email: String,
    pub role: Role,
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let token = match req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
        {
            Some(t) => t,
            None => return ready(Err(ErrorUnauthorized("Missing token"))),
        };

        let config = match req.app_data::<Data<Config>>() {
            Some(c) => c,
            None => {
                return ready(Err(actix_web::error::ErrorInternalServerError(
                    "Config missing",
                )));
            }
        };

        let data = match decode::<Claims>(
            token,
            &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            &Validation::default(),
        ) {
            Ok(d) => d,
            Err(_) => return ready(Err(ErrorUnauthorized("Invalid token"))),
        };

        let role = match Role::from_id(data.claims.role) {
            Some(r) => r,
            None => return ready(Err(ErrorUnauthorized("Invalid role"))),
        };

        ready(Ok(AuthUser {
            account_id: data.claims.account_id,
            email: data.claims.sub,
            role,
        }))
    }
}

impl AuthUser {
    pub fn require_manager(&self) -> Result<(), ApiError> {
        if self.role == Role::Manager {
            Ok(())
        } else {
            Err(ApiError::Authorization("Manager only".into()))
        }
    }

    pub fn require_employee(&self) -> Result<(), ApiError> {
        if self.role == Role::Employee {
            Ok(())
        } else {
            Err(ApiError::Authorization("Employee only".into()))
        }
    }

    /// Owner of the record, or any manager.
    pub fn require_owner_or_manager(&self, owner_id: u64) -> Result<(), ApiError> {
        if self.role == Role::Manager || self.account_id == owner_id {
            Ok(())
        } else {
            Err(ApiError::Authorization("Not your record".into()))
        }
    }

    pub fn is_employee(&self) -> bool {
        self.role == Role::Employee
    }
}
