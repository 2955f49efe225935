pub mod auth;
pub mod movie;
pub mod rating;
pub mod report;
pub mod user;

use actix_web::web;
use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::AppError;
use crate::response::{json_error_handler, query_error_handler};

/// Mounts every endpoint under `/api/v1`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .app_data(web::QueryConfig::default().error_handler(query_error_handler))
        .service(
            web::scope("/api/v1")
                .service(web::scope("/auth").configure(auth::config))
                .service(web::scope("/user").configure(user::config))
                .service(
                    web::scope("/movie")
                        .configure(movie::config)
                        .configure(rating::config)
                        .configure(report::config),
                ),
        );
}

/// Path ids that are not integers can never match a row.
pub(crate) fn parse_id(raw: &str, not_found: &str) -> Result<i32, AppError> {
    raw.trim()
        .parse::<i32>()
        .map_err(|_| AppError::not_found(not_found))
}

pub(crate) fn to_rfc3339(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, false)
}
