use actix_web::{http::StatusCode, web, HttpRequest, HttpResponse};
use chrono::Utc;
use log::info;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, QueryOrder, Set};
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::config::AppConfig;
use crate::entity::reported_movie::{self, APPROVAL_CHOICES, APPROVAL_PENDING};
use crate::error::AppError;
use crate::pagination::{fetch_page, PageQuery};
use crate::permission::{ensure_admin, Scope};
use crate::response::message;
use crate::routes::rating::resolve_movie;
use crate::routes::{parse_id, to_rfc3339};
use crate::validate::{Checker, IntInput};

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/report-movie/").route(web::post().to(report_movie)))
        .service(web::resource("/reported-movie-list/").route(web::get().to(reported_movie_list)))
        .service(web::resource("/review-report/{id}/").route(web::put().to(review_report)));
}

#[derive(Deserialize)]
struct ReportMovieRequest {
    movie: Option<IntInput>,
    reason: Option<String>,
}

#[derive(Deserialize)]
struct ReviewReportRequest {
    admin_approval: Option<String>,
}

#[derive(Serialize)]
struct ReportedMovieDto {
    id: i32,
    movie: i32,
    reported_by: i32,
    reason: String,
    created_at: String,
    acknowledged: bool,
    admin_approval: String,
}

async fn report_movie(
    db: web::Data<DatabaseConnection>,
    auth: AuthUser,
    payload: web::Json<ReportMovieRequest>,
) -> Result<HttpResponse, AppError> {
    let mut c = Checker::new();
    let movie_id = resolve_movie(db.get_ref(), &mut c, payload.movie.as_ref()).await?;
    let reason = c.text("reason", payload.reason.as_deref(), None);
    let (movie_id, reason) = c.finish(movie_id.zip(reason))?;

    let now = Utc::now();
    let report = reported_movie::ActiveModel {
        movie_id: Set(movie_id),
        reported_by: Set(auth.user_id),
        reason: Set(reason),
        acknowledged: Set(false),
        admin_approval: Set(APPROVAL_PENDING.to_string()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let inserted = report.insert(db.get_ref()).await?;
    info!("movie {} reported by user {} (report {})", movie_id, auth.user_id, inserted.id);

    Ok(message(StatusCode::CREATED, "Report submitted"))
}

async fn reported_movie_list(
    req: HttpRequest,
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
    auth: AuthUser,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, AppError> {
    let select = Scope::for_user(&auth).apply(
        reported_movie::Entity::find()
            .order_by_desc(reported_movie::Column::CreatedAt)
            .order_by_desc(reported_movie::Column::Id),
        reported_movie::Column::ReportedBy,
    );
    let page = fetch_page(db.get_ref(), select, query.resolve(&config)?, req.path()).await?;
    Ok(HttpResponse::Ok().json(page.map(|r| ReportedMovieDto {
        id: r.id,
        movie: r.movie_id,
        reported_by: r.reported_by,
        reason: r.reason,
        created_at: to_rfc3339(r.created_at),
        acknowledged: r.acknowledged,
        admin_approval: r.admin_approval,
    })))
}

async fn review_report(
    db: web::Data<DatabaseConnection>,
    auth: AuthUser,
    path: web::Path<String>,
    payload: web::Json<ReviewReportRequest>,
) -> Result<HttpResponse, AppError> {
    let id = parse_id(&path, "Invalid id")?;
    let report = reported_movie::Entity::find_by_id(id)
        .one(db.get_ref())
        .await?
        .ok_or_else(|| AppError::not_found("Invalid id"))?;
    ensure_admin(&auth, "Report acknowledgement can only be modified by an Admin")?;

    let approval = match payload.admin_approval.as_deref() {
        None => None,
        Some(raw) => Some(parse_approval(raw)?),
    };

    let mut active: reported_movie::ActiveModel = report.into();
    active.acknowledged = Set(true);
    if let Some(approval) = approval {
        active.admin_approval = Set(approval.to_string());
    }
    active.updated_at = Set(Utc::now());
    let updated = active.update(db.get_ref()).await?;
    info!(
        "report {} reviewed by admin {}: {}",
        id, auth.user_id, updated.admin_approval
    );

    Ok(message(StatusCode::ACCEPTED, "Report updated"))
}

/// Matches one of the approval choices, ignoring case.
fn parse_approval(raw: &str) -> Result<&'static str, AppError> {
    let wanted = raw.trim().to_uppercase();
    APPROVAL_CHOICES
        .iter()
        .find(|choice| **choice == wanted)
        .copied()
        .ok_or_else(|| {
            AppError::field("admin_approval", format!("\"{}\" is not a valid choice.", raw))
        })
}
