use std::collections::BTreeMap;

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

use crate::response::response_from_error;

/// Per-field validation messages, serialized as `{field: [reasons]}`.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{msg}")]
    Biz { status: StatusCode, msg: String },
    #[error("invalid input")]
    Validation(FieldErrors),
    #[error("token is invalid or expired")]
    TokenNotValid,
}

impl AppError {
    pub fn param_error(msg: impl Into<String>) -> Self {
        Self::biz(StatusCode::BAD_REQUEST, msg)
    }

    /// Missing rows answer 400 to stay compatible with existing clients.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::biz(StatusCode::BAD_REQUEST, msg)
    }

    pub fn weak_password() -> Self {
        Self::biz(StatusCode::BAD_REQUEST, "Given password is too weak.")
    }

    pub fn invalid_page() -> Self {
        Self::biz(StatusCode::BAD_REQUEST, "Invalid page.")
    }

    pub fn need_login() -> Self {
        Self::biz(
            StatusCode::UNAUTHORIZED,
            "Authentication credentials were not provided.",
        )
    }

    pub fn token_rejected() -> Self {
        Self::biz(
            StatusCode::UNAUTHORIZED,
            "Given token not valid for any token type",
        )
    }

    pub fn bad_credentials(msg: impl Into<String>) -> Self {
        Self::biz(StatusCode::BAD_REQUEST, msg)
    }

    pub fn missing_credentials(msg: impl Into<String>) -> Self {
        Self::biz(StatusCode::NOT_ACCEPTABLE, msg)
    }

    pub fn inactive() -> Self {
        Self::biz(
            StatusCode::FORBIDDEN,
            "Your account is currently inactive. Please contact IT support for assistance.",
        )
    }

    /// Ownership and role rejections answer 406 to stay compatible with existing clients.
    pub fn not_permitted(msg: impl Into<String>) -> Self {
        Self::biz(StatusCode::NOT_ACCEPTABLE, msg)
    }

    pub fn token_blacklisted() -> Self {
        Self::biz(StatusCode::NOT_ACCEPTABLE, "Token is already blacklisted")
    }

    pub fn system_exception() -> Self {
        Self::biz(StatusCode::INTERNAL_SERVER_ERROR, "system_exception")
    }

    pub fn field(name: &str, msg: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(name.to_string(), vec![msg.into()]);
        Self::Validation(errors)
    }

    fn biz(status: StatusCode, msg: impl Into<String>) -> Self {
        Self::Biz {
            status,
            msg: msg.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Biz { status, .. } => *status,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::TokenNotValid => StatusCode::UNAUTHORIZED,
        }
    }
}

impl From<sea_orm::DbErr> for AppError {
    fn from(err: sea_orm::DbErr) -> Self {
        log::error!("database error: {}", err);
        Self::system_exception()
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        self.status()
    }

    fn error_response(&self) -> HttpResponse {
        response_from_error(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_status_codes_are_kept() {
        assert_eq!(AppError::not_found("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::not_permitted("x").status(), StatusCode::NOT_ACCEPTABLE);
        assert_eq!(AppError::token_blacklisted().status(), StatusCode::NOT_ACCEPTABLE);
        assert_eq!(AppError::inactive().status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::TokenNotValid.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn field_error_holds_single_reason() {
        match AppError::field("movie", "This field is required.") {
            AppError::Validation(errors) => {
                assert_eq!(errors["movie"], vec!["This field is required.".to_string()]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
