use actix_web::{http::StatusCode, web, HttpRequest, HttpResponse};
use chrono::Utc;
use log::info;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};

use crate::aggregate::{lock_movie, recompute, RatingSummary};
use crate::auth::AuthUser;
use crate::config::AppConfig;
use crate::db::{is_unique_violation, map_tx_error};
use crate::entity::{movie, rating};
use crate::error::AppError;
use crate::pagination::{fetch_page, PageQuery};
use crate::permission::{ensure_rating_owner, Scope};
use crate::response::message;
use crate::routes::{parse_id, to_rfc3339};
use crate::validate::{Checker, IntInput, REQUIRED};

const RATING_NOT_FOUND: &str = "Movies rank not found";
const ALREADY_RATED: &str = "You have already rated this movie";

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/submit-rating/").route(web::post().to(submit_rating)))
        .service(web::resource("/update-rating/{id}/").route(web::put().to(update_rating)))
        .service(web::resource("/rated-movie-list/").route(web::get().to(rated_movie_list)));
}

#[derive(Deserialize)]
struct SubmitRatingRequest {
    movie: Option<IntInput>,
    rating: Option<IntInput>,
}

#[derive(Deserialize)]
struct UpdateRatingRequest {
    rating: Option<IntInput>,
}

#[derive(Serialize)]
struct RatedMovieDto {
    id: i32,
    movie: i32,
    rating: i32,
    updated_at: String,
}

fn check_rating(c: &mut Checker, value: Option<&IntInput>) -> Option<i32> {
    c.int("rating", value, Some(1), Some(5)).map(|v| v as i32)
}

async fn submit_rating(
    db: web::Data<DatabaseConnection>,
    auth: AuthUser,
    payload: web::Json<SubmitRatingRequest>,
) -> Result<HttpResponse, AppError> {
    let mut c = Checker::new();
    let movie_id = resolve_movie(db.get_ref(), &mut c, payload.movie.as_ref()).await?;
    let value = check_rating(&mut c, payload.rating.as_ref());
    let (movie_id, value) = c.finish(movie_id.zip(value))?;

    let already = rating::Entity::find()
        .filter(rating::Column::UserId.eq(auth.user_id))
        .filter(rating::Column::MovieId.eq(movie_id))
        .one(db.get_ref())
        .await?;
    if already.is_some() {
        return Err(AppError::field("non_field_errors", ALREADY_RATED));
    }

    let user_id = auth.user_id;
    let summary = db
        .transaction::<_, Option<RatingSummary>, AppError>(|txn| {
            Box::pin(async move {
                if !lock_movie(txn, movie_id).await? {
                    return Err(AppError::field(
                        "movie",
                        format!("Invalid pk \"{}\" - object does not exist.", movie_id),
                    ));
                }
                let now = Utc::now();
                let rating_model = rating::ActiveModel {
                    user_id: Set(user_id),
                    movie_id: Set(movie_id),
                    rating: Set(value),
                    created_at: Set(now),
                    updated_at: Set(now),
                    ..Default::default()
                };
                rating_model.insert(txn).await.map_err(|e| {
                    if is_unique_violation(&e) {
                        AppError::field("non_field_errors", ALREADY_RATED)
                    } else {
                        e.into()
                    }
                })?;
                recompute(txn, movie_id).await
            })
        })
        .await
        .map_err(map_tx_error)?;
    info!(
        "user {} rated movie {} with {} (total now {:?})",
        user_id,
        movie_id,
        value,
        summary.map(|s| s.total_rating)
    );

    Ok(message(StatusCode::CREATED, "Rating submitted"))
}

async fn update_rating(
    db: web::Data<DatabaseConnection>,
    auth: AuthUser,
    path: web::Path<String>,
    payload: web::Json<UpdateRatingRequest>,
) -> Result<HttpResponse, AppError> {
    let id = parse_id(&path, RATING_NOT_FOUND)?;
    let exist = rating::Entity::find_by_id(id)
        .one(db.get_ref())
        .await?
        .ok_or_else(|| AppError::not_found(RATING_NOT_FOUND))?;
    ensure_rating_owner(&auth, &exist)?;

    let mut c = Checker::new();
    let value = check_rating(&mut c, payload.rating.as_ref());
    let value = c.finish(value)?;

    let movie_id = exist.movie_id;
    db.transaction::<_, Option<RatingSummary>, AppError>(|txn| {
        Box::pin(async move {
            lock_movie(txn, movie_id).await?;
            let mut active: rating::ActiveModel = exist.into();
            active.rating = Set(value);
            active.updated_at = Set(Utc::now());
            active.update(txn).await?;
            recompute(txn, movie_id).await
        })
    })
    .await
    .map_err(map_tx_error)?;
    info!("rating {} set to {} by user {}", id, value, auth.user_id);

    Ok(message(StatusCode::ACCEPTED, "Rating updated"))
}

async fn rated_movie_list(
    req: HttpRequest,
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
    auth: AuthUser,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, AppError> {
    let select = Scope::for_user(&auth).apply(
        rating::Entity::find()
            .order_by_desc(rating::Column::CreatedAt)
            .order_by_desc(rating::Column::Id),
        rating::Column::UserId,
    );
    let page = fetch_page(db.get_ref(), select, query.resolve(&config)?, req.path()).await?;
    Ok(HttpResponse::Ok().json(page.map(|r| RatedMovieDto {
        id: r.id,
        movie: r.movie_id,
        rating: r.rating,
        updated_at: to_rfc3339(r.updated_at),
    })))
}

/// Resolves the `movie` field to an existing movie id, recording a field
/// error otherwise.
pub(crate) async fn resolve_movie(
    db: &DatabaseConnection,
    c: &mut Checker,
    value: Option<&IntInput>,
) -> Result<Option<i32>, AppError> {
    let Some(input) = value else {
        c.add("movie", REQUIRED);
        return Ok(None);
    };
    let found = match input.parse().and_then(|v| i32::try_from(v).ok()) {
        Some(id) => movie::Entity::find_by_id(id).one(db).await?,
        None => None,
    };
    match found {
        Some(m) => Ok(Some(m.id)),
        None => {
            c.add(
                "movie",
                format!("Invalid pk \"{}\" - object does not exist.", input.raw()),
            );
            Ok(None)
        }
    }
}
