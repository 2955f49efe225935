use actix_web::{http::StatusCode, web, HttpResponse};
use chrono::Utc;
use log::{info, warn};
use sea_orm::{ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::config::AppConfig;
use crate::entity::user;
use crate::error::AppError;
use crate::password::verify_password;
use crate::response::message;
use crate::token;
use crate::validate::Checker;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/login/").route(web::post().to(login)))
        .service(web::resource("/logout/").route(web::post().to(logout)))
        .service(web::resource("/token/refresh/").route(web::post().to(refresh)))
        .service(web::resource("/token/verify/").route(web::post().to(verify)));
}

#[derive(Deserialize)]
struct LoginRequest {
    username_or_email: Option<String>,
    password: Option<String>,
}

#[derive(Serialize)]
struct LoginResponse {
    refresh: String,
    access: String,
    message: &'static str,
}

#[derive(Deserialize)]
struct RefreshRequest {
    refresh: Option<String>,
}

#[derive(Deserialize)]
struct VerifyRequest {
    token: Option<String>,
}

#[derive(Serialize)]
struct AccessResponse {
    access: String,
}

#[derive(Serialize)]
struct EmptyResponse {}

async fn login(
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
    payload: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    let identifier = payload.username_or_email.as_deref().map(str::trim).unwrap_or_default();
    let password = payload.password.as_deref().unwrap_or_default();
    if identifier.is_empty() || password.is_empty() {
        return Err(AppError::missing_credentials(
            "Username/Email and password is required",
        ));
    }

    let found = user::Entity::find()
        .filter(
            Condition::any()
                .add(user::Column::Username.eq(identifier))
                .add(user::Column::Email.eq(identifier.to_lowercase())),
        )
        .one(db.get_ref())
        .await?;
    let Some(found) = found else {
        return Err(AppError::bad_credentials("Invalid username or email"));
    };
    if !found.is_active {
        return Err(AppError::inactive());
    }
    if !verify_password(password, &found.password_hash) {
        warn!("failed login for user {}", found.id);
        return Err(AppError::bad_credentials("Invalid username or password"));
    }

    let pair = token::issue_pair(&config, &found)?;
    let user_id = found.id;
    let mut active: user::ActiveModel = found.into();
    active.last_login = Set(Some(Utc::now()));
    active.update(db.get_ref()).await?;
    info!("user {} logged in", user_id);

    Ok(HttpResponse::Accepted().json(LoginResponse {
        refresh: pair.refresh,
        access: pair.access,
        message: "Login successful",
    }))
}

async fn logout(
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
    auth: AuthUser,
    payload: web::Json<RefreshRequest>,
) -> Result<HttpResponse, AppError> {
    let refresh = payload.refresh.as_deref().map(str::trim).unwrap_or_default();
    if refresh.is_empty() {
        return Err(AppError::missing_credentials("Token is required"));
    }

    let claims = token::check_refresh(db.get_ref(), &config, refresh)
        .await
        .map_err(|e| e.into_app_error(AppError::token_blacklisted()))?;
    token::blacklist(db.get_ref(), &claims)
        .await
        .map_err(|e| e.into_app_error(AppError::token_blacklisted()))?;
    info!("user {} logged out", auth.user_id);

    Ok(message(StatusCode::ACCEPTED, "Logout successful"))
}

async fn refresh(
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
    payload: web::Json<RefreshRequest>,
) -> Result<HttpResponse, AppError> {
    let mut c = Checker::new();
    let raw = c.text("refresh", payload.refresh.as_deref(), None);
    let raw = c.finish(raw)?;

    let claims = token::check_refresh(db.get_ref(), &config, &raw)
        .await
        .map_err(|e| e.into_app_error(AppError::TokenNotValid))?;
    let access = token::access_from_refresh(&config, &claims)?;
    Ok(HttpResponse::Ok().json(AccessResponse { access }))
}

async fn verify(
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
    payload: web::Json<VerifyRequest>,
) -> Result<HttpResponse, AppError> {
    let mut c = Checker::new();
    let raw = c.text("token", payload.token.as_deref(), None);
    let raw = c.finish(raw)?;

    let claims = token::decode_token(&config, &raw).map_err(|_| AppError::TokenNotValid)?;
    if token::is_blacklisted(db.get_ref(), &claims.jti).await? {
        return Err(AppError::TokenNotValid);
    }
    Ok(HttpResponse::Ok().json(EmptyResponse {}))
}
