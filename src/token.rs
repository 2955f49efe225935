//! Access/refresh JWT issuance and the refresh-token denylist.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::AppConfig;
use crate::db::is_unique_violation;
use crate::entity::{blacklisted_token, user};
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub token_type: TokenType,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
    pub user_id: String,
    pub name: String,
    pub username: String,
}

impl Claims {
    pub fn user_id(&self) -> Option<i32> {
        self.user_id.parse().ok()
    }

    fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0).single().unwrap_or_else(Utc::now)
    }
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("invalid signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
    #[error("malformed token")]
    Malformed,
    #[error("wrong token type")]
    WrongType,
    #[error("token is blacklisted")]
    Blacklisted,
    #[error(transparent)]
    Store(#[from] sea_orm::DbErr),
}

impl TokenError {
    /// Store failures become a 500; everything else is the caller's rejection.
    pub fn into_app_error(self, rejection: AppError) -> AppError {
        match self {
            Self::Store(e) => e.into(),
            _ => rejection,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TokenPair {
    pub refresh: String,
    pub access: String,
}

pub fn issue_pair(config: &AppConfig, user: &user::Model) -> Result<TokenPair, AppError> {
    let refresh = build_claims(
        TokenType::Refresh,
        Duration::days(config.refresh_token_days),
        user.id.to_string(),
        user.display_name(),
        user.username.clone(),
    );
    let access = build_claims(
        TokenType::Access,
        Duration::minutes(config.access_token_minutes),
        refresh.user_id.clone(),
        refresh.name.clone(),
        refresh.username.clone(),
    );
    Ok(TokenPair {
        refresh: sign(config, &refresh)?,
        access: sign(config, &access)?,
    })
}

/// New access token carrying the identity of a validated refresh token.
pub fn access_from_refresh(config: &AppConfig, refresh: &Claims) -> Result<String, AppError> {
    let access = build_claims(
        TokenType::Access,
        Duration::minutes(config.access_token_minutes),
        refresh.user_id.clone(),
        refresh.name.clone(),
        refresh.username.clone(),
    );
    sign(config, &access)
}

fn build_claims(token_type: TokenType, ttl: Duration, user_id: String, name: String, username: String) -> Claims {
    let now = Utc::now();
    Claims {
        token_type,
        exp: (now + ttl).timestamp(),
        iat: now.timestamp(),
        jti: new_jti(),
        user_id,
        name,
        username,
    }
}

pub fn sign(config: &AppConfig, claims: &Claims) -> Result<String, AppError> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| {
        log::error!("token encode failed: {}", e);
        AppError::system_exception()
    })
}

pub fn decode_token(config: &AppConfig, token: &str) -> Result<Claims, TokenError> {
    let key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    decode::<Claims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidSignature => TokenError::InvalidSignature,
            _ => TokenError::Malformed,
        })
}

pub fn decode_expected(config: &AppConfig, token: &str, expected: TokenType) -> Result<Claims, TokenError> {
    let claims = decode_token(config, token)?;
    if claims.token_type != expected {
        return Err(TokenError::WrongType);
    }
    Ok(claims)
}

pub async fn is_blacklisted<C: ConnectionTrait>(db: &C, jti: &str) -> Result<bool, sea_orm::DbErr> {
    let found = blacklisted_token::Entity::find()
        .filter(blacklisted_token::Column::Jti.eq(jti))
        .one(db)
        .await?;
    Ok(found.is_some())
}

/// Validates a refresh token and checks it against the denylist.
pub async fn check_refresh<C: ConnectionTrait>(
    db: &C,
    config: &AppConfig,
    token: &str,
) -> Result<Claims, TokenError> {
    let claims = decode_expected(config, token, TokenType::Refresh)?;
    if is_blacklisted(db, &claims.jti).await? {
        return Err(TokenError::Blacklisted);
    }
    Ok(claims)
}

/// Adds the token to the denylist. A concurrent insert of the same `jti`
/// reports `Blacklisted`.
pub async fn blacklist<C: ConnectionTrait>(db: &C, claims: &Claims) -> Result<(), TokenError> {
    let row = blacklisted_token::ActiveModel {
        jti: Set(claims.jti.clone()),
        user_id: Set(claims.user_id()),
        expires_at: Set(claims.expires_at()),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    match row.insert(db).await {
        Ok(_) => Ok(()),
        Err(e) if is_unique_violation(&e) => Err(TokenError::Blacklisted),
        Err(e) => Err(e.into()),
    }
}

fn new_jti() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
