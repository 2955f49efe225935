use actix_web::{http::StatusCode, web, HttpRequest, HttpResponse};
use chrono::{NaiveDate, Utc};
use log::info;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};

use crate::aggregate::format_avg;
use crate::auth::AuthUser;
use crate::config::AppConfig;
use crate::entity::{movie, user};
use crate::error::AppError;
use crate::pagination::{fetch_page, PageQuery};
use crate::permission::ensure_movie_owner;
use crate::response::message;
use crate::routes::{parse_id, to_rfc3339};
use crate::validate::{Checker, IntInput};

const MOVIE_NOT_FOUND: &str = "Movie not found";

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/create-movie/").route(web::post().to(create_movie)))
        .service(web::resource("/my-movies/").route(web::get().to(my_movies)))
        .service(web::resource("/movies_list/").route(web::get().to(movies_list)))
        .service(web::resource("/retrieve-movie/{id}/").route(web::get().to(retrieve_movie)))
        .service(web::resource("/update-movie/{id}/").route(web::put().to(update_movie)));
}

/// Body of both create-movie and update-movie; every field is required.
#[derive(Deserialize)]
struct MovieRequest {
    name: Option<String>,
    description: Option<String>,
    released_at: Option<String>,
    duration: Option<IntInput>,
    genre: Option<String>,
    language: Option<String>,
}

struct MovieFields {
    name: String,
    description: String,
    released_at: NaiveDate,
    duration: i32,
    genre: String,
    language: String,
}

impl MovieRequest {
    fn validate(&self) -> Result<MovieFields, AppError> {
        let mut c = Checker::new();
        let name = c.text("name", self.name.as_deref(), Some(150));
        let description = c.text("description", self.description.as_deref(), None);
        let released_at = c.date("released_at", self.released_at.as_deref());
        let duration = c.int("duration", self.duration.as_ref(), Some(0), Some(i32::MAX as i64));
        let genre = c.text("genre", self.genre.as_deref(), Some(50));
        let language = c.text("language", self.language.as_deref(), Some(50));
        let fields = match (name, description, released_at, duration, genre, language) {
            (Some(name), Some(description), Some(released_at), Some(duration), Some(genre), Some(language)) => {
                Some(MovieFields {
                    name,
                    description,
                    released_at,
                    duration: duration as i32,
                    genre,
                    language,
                })
            }
            _ => None,
        };
        c.finish(fields)
    }
}

#[derive(Serialize)]
struct MovieListDto {
    id: i32,
    name: String,
    description: String,
    genre: String,
    avg_rating: String,
    total_rating: i32,
}

#[derive(Serialize)]
struct MovieDetailDto {
    id: i32,
    name: String,
    description: String,
    released_at: NaiveDate,
    duration: i32,
    genre: String,
    created_by: Option<String>,
    avg_rating: String,
    total_rating: i32,
    language: String,
    updated_at: String,
}

async fn create_movie(
    db: web::Data<DatabaseConnection>,
    auth: AuthUser,
    payload: web::Json<MovieRequest>,
) -> Result<HttpResponse, AppError> {
    let fields = payload.validate()?;
    let now = Utc::now();

    let movie_model = movie::ActiveModel {
        name: Set(fields.name),
        description: Set(fields.description),
        released_at: Set(fields.released_at),
        duration: Set(fields.duration),
        genre: Set(fields.genre),
        language: Set(fields.language),
        created_by: Set(Some(auth.user_id)),
        avg_rating: Set(0.0),
        total_rating: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let inserted = movie_model.insert(db.get_ref()).await?;
    info!("movie {} created by user {}", inserted.id, auth.user_id);

    Ok(message(StatusCode::CREATED, "Movie created"))
}

async fn my_movies(
    req: HttpRequest,
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
    auth: AuthUser,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, AppError> {
    let select = newest_first()
        .filter(movie::Column::CreatedBy.eq(auth.user_id));
    let page = fetch_page(db.get_ref(), select, query.resolve(&config)?, req.path()).await?;
    Ok(HttpResponse::Ok().json(page.map(to_list_dto)))
}

async fn movies_list(
    req: HttpRequest,
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
    _auth: AuthUser,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, AppError> {
    let page = fetch_page(db.get_ref(), newest_first(), query.resolve(&config)?, req.path()).await?;
    Ok(HttpResponse::Ok().json(page.map(to_list_dto)))
}

async fn retrieve_movie(
    db: web::Data<DatabaseConnection>,
    _auth: AuthUser,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let id = parse_id(&path, MOVIE_NOT_FOUND)?;
    let movie_item = movie::Entity::find_by_id(id)
        .one(db.get_ref())
        .await?
        .ok_or_else(|| AppError::not_found(MOVIE_NOT_FOUND))?;

    let creator = match movie_item.created_by {
        Some(user_id) => user::Entity::find_by_id(user_id)
            .one(db.get_ref())
            .await?
            .map(|u| u.display_name()),
        None => None,
    };

    Ok(HttpResponse::Ok().json(MovieDetailDto {
        id: movie_item.id,
        name: movie_item.name,
        description: movie_item.description,
        released_at: movie_item.released_at,
        duration: movie_item.duration,
        genre: movie_item.genre,
        created_by: creator,
        avg_rating: format_avg(movie_item.avg_rating),
        total_rating: movie_item.total_rating,
        language: movie_item.language,
        updated_at: to_rfc3339(movie_item.updated_at),
    }))
}

async fn update_movie(
    db: web::Data<DatabaseConnection>,
    auth: AuthUser,
    path: web::Path<String>,
    payload: web::Json<MovieRequest>,
) -> Result<HttpResponse, AppError> {
    let id = parse_id(&path, MOVIE_NOT_FOUND)?;
    let exist = movie::Entity::find_by_id(id)
        .one(db.get_ref())
        .await?
        .ok_or_else(|| AppError::not_found(MOVIE_NOT_FOUND))?;
    ensure_movie_owner(&auth, &exist)?;

    let fields = payload.validate()?;
    // Only the metadata columns are written; the aggregate fields belong to
    // the rating path.
    let mut active: movie::ActiveModel = exist.into();
    active.name = Set(fields.name);
    active.description = Set(fields.description);
    active.released_at = Set(fields.released_at);
    active.duration = Set(fields.duration);
    active.genre = Set(fields.genre);
    active.language = Set(fields.language);
    active.updated_at = Set(Utc::now());
    active.update(db.get_ref()).await?;
    info!("movie {} updated by user {}", id, auth.user_id);

    Ok(message(StatusCode::CREATED, "Movie updated"))
}

fn newest_first() -> sea_orm::Select<movie::Entity> {
    movie::Entity::find()
        .order_by_desc(movie::Column::CreatedAt)
        .order_by_desc(movie::Column::Id)
}

fn to_list_dto(model: movie::Model) -> MovieListDto {
    MovieListDto {
        id: model.id,
        name: model.name,
        description: model.description,
        genre: model.genre,
        avg_rating: format_avg(model.avg_rating),
        total_rating: model.total_rating,
    }
}
