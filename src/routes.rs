use crate::{
    api::{account, stats, vacation_request},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-route limiter
    fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
        let per_ms = if requests_per_min == 0 {
            1
        } else {
            60_000 / requests_per_min as u64
        };
        let cfg = GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .unwrap();
        Governor::new(&cfg)
    }

    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let refresh_limiter = Arc::new(build_limiter(config.rate_refresh_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(refresh_limiter.clone())
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(protected_limiter) // rate limiting
            .service(
                web::scope("/accounts")
                    // /accounts
                    .service(
                        web::resource("")
                            .route(web::post().to(account::create_account))
                            .route(web::get().to(account::list_accounts)),
                    )
                    // /accounts/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(account::get_account))
                            .route(web::put().to(account::update_account))
                            .route(web::delete().to(account::delete_account)),
                    )
                    // /accounts/{id}/recompute-balance
                    .service(
                        web::resource("/{id}/recompute-balance")
                            .route(web::post().to(account::recompute_balance)),
                    ),
            )
            .service(
                web::scope("/requests")
                    // /requests
                    .service(
                        web::resource("")
                            .route(web::get().to(vacation_request::list_requests))
                            .route(web::post().to(vacation_request::create_request)),
                    )
                    // /requests/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(vacation_request::get_request))
                            .route(web::put().to(vacation_request::update_request))
                            .route(web::delete().to(vacation_request::delete_request)),
                    )
                    // /requests/{id}/approve
                    .service(
                        web::resource("/{id}/approve")
                            .route(web::put().to(vacation_request::approve_request)),
                    )
                    // /requests/{id}/reject
                    .service(
                        web::resource("/{id}/reject")
                            .route(web::put().to(vacation_request::reject_request)),
                    ),
            )
            .service(
                web::scope("/stats")
                    // /stats/summary
                    .service(web::resource("/summary").route(web::get().to(stats::summary))),
            ),
    );
}

// LOGIN
//  ├─ access_token (15 min)
//  └─ refresh_token (7 days)

// API REQUEST
//  └─ Authorization: Bearer access_token

// ACCESS EXPIRED
//  └─ POST /refresh with refresh_token
//       └─ returns new access_token
