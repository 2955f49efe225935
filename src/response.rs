use actix_web::{
    error::{JsonPayloadError, QueryPayloadError},
    http::StatusCode,
    HttpRequest, HttpResponse,
};
use serde::Serialize;

use crate::error::AppError;

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub fn message(status: StatusCode, msg: &str) -> HttpResponse {
    HttpResponse::build(status).json(MessageResponse::new(msg))
}

#[derive(Serialize)]
struct TokenErrorBody {
    detail: &'static str,
    code: &'static str,
}

pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    log::debug!("rejected request body: {}", err);
    AppError::param_error("Invalid request body").into()
}

pub fn query_error_handler(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    log::debug!("rejected query string: {}", err);
    AppError::invalid_page().into()
}

pub fn response_from_error(err: &AppError) -> HttpResponse {
    let mut builder = HttpResponse::build(err.status());
    match err {
        AppError::Biz { msg, .. } => builder.json(MessageResponse::new(msg.as_str())),
        AppError::Validation(errors) => builder.json(errors),
        AppError::TokenNotValid => builder.json(TokenErrorBody {
            detail: "Token is invalid or expired",
            code: "token_not_valid",
        }),
    }
}
