use actix_web::{http::StatusCode, web, HttpRequest, HttpResponse};
use chrono::{NaiveDate, Utc};
use log::info;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::config::AppConfig;
use crate::db::is_unique_violation;
use crate::entity::user::{self, ROLE_ADMIN, ROLE_USER};
use crate::error::AppError;
use crate::pagination::{fetch_page, PageQuery};
use crate::password::{check_strength, hash_password};
use crate::permission::{ensure_admin, ensure_self};
use crate::response::message;
use crate::routes::parse_id;
use crate::validate::{Checker, INVALID_DATE};

const USER_NOT_FOUND: &str = "User not found";
const USERNAME_TAKEN: &str = "A user with that username already exists.";
const EMAIL_TAKEN: &str = "user with this email already exists.";

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/create-user/").route(web::post().to(create_user)))
        .service(web::resource("/create-admin/").route(web::post().to(create_admin)))
        .service(web::resource("/update-user/{id}/").route(web::put().to(update_user)))
        .service(web::resource("/update-my-profile/{id}/").route(web::put().to(update_my_profile)))
        .service(web::resource("/list-user/").route(web::get().to(user_list)))
        .service(web::resource("/retrieve-user/{id}/").route(web::get().to(user_retrieve)));
}

#[derive(Deserialize)]
pub struct CreateAccountRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub phone_number: Option<String>,
}

/// Fields a user may change on their own profile.
#[derive(Deserialize)]
struct UpdateProfileRequest {
    first_name: Option<String>,
    last_name: Option<String>,
    username: Option<String>,
    email: Option<String>,
    phone_number: Option<String>,
    date_of_birth: Option<String>,
}

/// Admin edit of any account: the profile fields plus activation.
#[derive(Deserialize)]
struct UpdateUserRequest {
    #[serde(flatten)]
    profile: UpdateProfileRequest,
    is_active: Option<bool>,
}

#[derive(Serialize)]
struct UserDto {
    id: i32,
    name: String,
    username: String,
    email: String,
    role: String,
    phone_number: Option<String>,
    date_of_birth: Option<NaiveDate>,
}

#[derive(Default)]
struct ProfileChanges {
    first_name: Option<Option<String>>,
    last_name: Option<Option<String>>,
    username: Option<String>,
    email: Option<String>,
    phone_number: Option<Option<String>>,
    date_of_birth: Option<Option<NaiveDate>>,
}

async fn create_user(
    db: web::Data<DatabaseConnection>,
    _auth: AuthUser,
    payload: web::Json<CreateAccountRequest>,
) -> Result<HttpResponse, AppError> {
    let created = create_account(db.get_ref(), &payload, ROLE_USER).await?;
    info!("user {} ({}) created", created.id, created.username);
    Ok(message(StatusCode::CREATED, "User created"))
}

async fn create_admin(
    db: web::Data<DatabaseConnection>,
    auth: AuthUser,
    payload: web::Json<CreateAccountRequest>,
) -> Result<HttpResponse, AppError> {
    ensure_admin(&auth, "Only an admin can create another admin")?;
    let created = create_account(db.get_ref(), &payload, ROLE_ADMIN).await?;
    info!(
        "admin {} ({}) created by admin {}",
        created.id, created.username, auth.user_id
    );
    Ok(message(StatusCode::CREATED, "Admin created"))
}

/// Validates and stores a new account. Admin accounts also get the staff and
/// superuser flags.
pub async fn create_account<C: ConnectionTrait>(
    db: &C,
    payload: &CreateAccountRequest,
    role: &str,
) -> Result<user::Model, AppError> {
    if let Some(password) = payload.password.as_deref() {
        check_strength(password, payload.username.as_deref(), payload.email.as_deref())?;
    }

    let mut c = Checker::new();
    let username = c.text("username", payload.username.as_deref(), Some(150));
    let username = c.username("username", username);
    let email = c.text("email", payload.email.as_deref(), Some(254));
    let email = c.email("email", email);
    let password = c.secret("password", payload.password.as_deref(), 128);
    let first_name = c.blankable("first_name", payload.first_name.as_deref(), 150);
    let last_name = c.blankable("last_name", payload.last_name.as_deref(), 150);
    let phone_number = c.blankable("phone_number", payload.phone_number.as_deref(), 20);
    check_unique(db, &mut c, username.as_deref(), email.as_deref(), None).await?;
    let (username, (email, password)) = c.finish(username.zip(email.zip(password)))?;

    let is_admin = role == ROLE_ADMIN;
    let now = Utc::now();
    let user_model = user::ActiveModel {
        username: Set(username),
        email: Set(email),
        password_hash: Set(hash_password(&password)?),
        first_name: Set(first_name.flatten()),
        last_name: Set(last_name.flatten()),
        phone_number: Set(phone_number.flatten()),
        date_of_birth: Set(None),
        role: Set(role.to_string()),
        is_active: Set(true),
        is_staff: Set(is_admin),
        is_superuser: Set(is_admin),
        last_login: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    user_model.insert(db).await.map_err(map_insert_error)
}

async fn update_user(
    db: web::Data<DatabaseConnection>,
    auth: AuthUser,
    path: web::Path<String>,
    payload: web::Json<UpdateUserRequest>,
) -> Result<HttpResponse, AppError> {
    ensure_admin(&auth, "Unauthorize access ! Only admin can update users info")?;
    let id = parse_id(&path, USER_NOT_FOUND)?;
    let exist = user::Entity::find_by_id(id)
        .one(db.get_ref())
        .await?
        .ok_or_else(|| AppError::not_found(USER_NOT_FOUND))?;

    let changes = check_profile(db.get_ref(), &payload.profile, id).await?;
    let mut active = apply_profile(exist.into(), changes);
    if let Some(is_active) = payload.is_active {
        active.is_active = Set(is_active);
    }
    active.update(db.get_ref()).await.map_err(map_insert_error)?;
    info!("user {} updated by admin {}", id, auth.user_id);

    Ok(message(StatusCode::ACCEPTED, "User updated"))
}

async fn update_my_profile(
    db: web::Data<DatabaseConnection>,
    auth: AuthUser,
    path: web::Path<String>,
    payload: web::Json<UpdateProfileRequest>,
) -> Result<HttpResponse, AppError> {
    let id = parse_id(&path, USER_NOT_FOUND)?;
    let exist = user::Entity::find_by_id(id)
        .one(db.get_ref())
        .await?
        .ok_or_else(|| AppError::not_found(USER_NOT_FOUND))?;
    ensure_self(&auth, &exist)?;

    let changes = check_profile(db.get_ref(), &payload, id).await?;
    apply_profile(exist.into(), changes)
        .update(db.get_ref())
        .await
        .map_err(map_insert_error)?;
    info!("user {} updated own profile", id);

    Ok(message(StatusCode::ACCEPTED, "Profile updated"))
}

async fn user_list(
    req: HttpRequest,
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
    _auth: AuthUser,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, AppError> {
    let select = user::Entity::find()
        .order_by_desc(user::Column::CreatedAt)
        .order_by_desc(user::Column::Id);
    let page = fetch_page(db.get_ref(), select, query.resolve(&config)?, req.path()).await?;
    Ok(HttpResponse::Ok().json(page.map(to_user_dto)))
}

async fn user_retrieve(
    db: web::Data<DatabaseConnection>,
    _auth: AuthUser,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let id = parse_id(&path, "Invalid id")?;
    let user_item = user::Entity::find_by_id(id)
        .one(db.get_ref())
        .await?
        .ok_or_else(|| AppError::not_found("Invalid id"))?;
    Ok(HttpResponse::Ok().json(to_user_dto(user_item)))
}

/// Partial update: absent fields stay untouched, blank optional fields clear.
async fn check_profile<C: ConnectionTrait>(
    db: &C,
    payload: &UpdateProfileRequest,
    user_id: i32,
) -> Result<ProfileChanges, AppError> {
    let mut c = Checker::new();
    let username = c.optional_text("username", payload.username.as_deref(), Some(150));
    let username = c.username("username", username);
    let email = c.optional_text("email", payload.email.as_deref(), Some(254));
    let email = c.email("email", email);
    let date_of_birth = match c.blankable("date_of_birth", payload.date_of_birth.as_deref(), 32) {
        Some(Some(raw)) => match NaiveDate::parse_from_str(&raw, "%Y-%m-%d") {
            Ok(d) => Some(Some(d)),
            Err(_) => {
                c.add("date_of_birth", INVALID_DATE);
                None
            }
        },
        Some(None) => Some(None),
        None => None,
    };
    let changes = ProfileChanges {
        first_name: c.blankable("first_name", payload.first_name.as_deref(), 150),
        last_name: c.blankable("last_name", payload.last_name.as_deref(), 150),
        phone_number: c.blankable("phone_number", payload.phone_number.as_deref(), 20),
        username,
        email,
        date_of_birth,
    };
    check_unique(
        db,
        &mut c,
        changes.username.as_deref(),
        changes.email.as_deref(),
        Some(user_id),
    )
    .await?;
    c.finish(Some(changes))
}

fn apply_profile(mut active: user::ActiveModel, changes: ProfileChanges) -> user::ActiveModel {
    if let Some(v) = changes.first_name {
        active.first_name = Set(v);
    }
    if let Some(v) = changes.last_name {
        active.last_name = Set(v);
    }
    if let Some(v) = changes.username {
        active.username = Set(v);
    }
    if let Some(v) = changes.email {
        active.email = Set(v);
    }
    if let Some(v) = changes.phone_number {
        active.phone_number = Set(v);
    }
    if let Some(v) = changes.date_of_birth {
        active.date_of_birth = Set(v);
    }
    active.updated_at = Set(Utc::now());
    active
}

async fn check_unique<C: ConnectionTrait>(
    db: &C,
    c: &mut Checker,
    username: Option<&str>,
    email: Option<&str>,
    exclude: Option<i32>,
) -> Result<(), AppError> {
    if let Some(username) = username {
        let mut query = user::Entity::find().filter(user::Column::Username.eq(username));
        if let Some(id) = exclude {
            query = query.filter(user::Column::Id.ne(id));
        }
        if query.one(db).await?.is_some() {
            c.add("username", USERNAME_TAKEN);
        }
    }
    if let Some(email) = email {
        let mut query = user::Entity::find().filter(user::Column::Email.eq(email));
        if let Some(id) = exclude {
            query = query.filter(user::Column::Id.ne(id));
        }
        if query.one(db).await?.is_some() {
            c.add("email", EMAIL_TAKEN);
        }
    }
    Ok(())
}

/// A concurrent writer can still win the unique index after the pre-check.
fn map_insert_error(err: sea_orm::DbErr) -> AppError {
    if is_unique_violation(&err) {
        if err.to_string().contains("email") {
            AppError::field("email", EMAIL_TAKEN)
        } else {
            AppError::field("username", USERNAME_TAKEN)
        }
    } else {
        err.into()
    }
}

fn to_user_dto(model: user::Model) -> UserDto {
    UserDto {
        id: model.id,
        name: model.display_name(),
        username: model.username,
        email: model.email,
        role: model.role,
        phone_number: model.phone_number,
        date_of_birth: model.date_of_birth,
    }
}
