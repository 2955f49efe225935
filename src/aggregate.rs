//! Movie rating aggregation.
//!
//! `avg_rating` and `total_rating` are always recomputed from the rating rows,
//! never patched incrementally. Callers run [`lock_movie`], the rating write
//! and [`recompute`] on one transaction so concurrent writers for the same
//! movie queue behind the movie row lock.

use sea_orm::{
    sea_query::Expr, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter,
};

use crate::db::query_one;
use crate::entity::movie;
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingSummary {
    pub avg_rating: f64,
    pub total_rating: i32,
}

/// Mean of `count` ratings summing to `sum`, rounded half-up to 2 decimals.
/// Integer arithmetic keeps the rounding exact.
pub fn summarize(sum: i64, count: i64) -> RatingSummary {
    if count <= 0 {
        return RatingSummary {
            avg_rating: 0.0,
            total_rating: 0,
        };
    }
    let cents = (sum * 200 + count) / (count * 2);
    RatingSummary {
        avg_rating: cents as f64 / 100.0,
        total_rating: count as i32,
    }
}

/// Two-decimal wire form of an average, e.g. `4.50`.
pub fn format_avg(avg: f64) -> String {
    format!("{:.2}", avg)
}

/// Takes the write lock on the movie row for the rest of the transaction.
/// Returns whether the movie still exists.
pub async fn lock_movie<C: ConnectionTrait>(conn: &C, movie_id: i32) -> Result<bool, AppError> {
    movie::Entity::update_many()
        .col_expr(
            movie::Column::TotalRating,
            Expr::col(movie::Column::TotalRating).into(),
        )
        .filter(movie::Column::Id.eq(movie_id))
        .exec(conn)
        .await?;
    Ok(movie::Entity::find_by_id(movie_id).one(conn).await?.is_some())
}

/// Recomputes and stores the aggregate fields of `movie_id`. A movie that no
/// longer exists is left alone and `None` is returned.
pub async fn recompute<C: ConnectionTrait>(conn: &C, movie_id: i32) -> Result<Option<RatingSummary>, AppError> {
    let row = query_one(
        conn,
        "SELECT COUNT(rating) AS cnt, CAST(COALESCE(SUM(rating), 0) AS SIGNED) AS total \
         FROM t_rating WHERE movie_id = ?",
        vec![movie_id.into()],
    )
    .await?;
    let (count, sum) = match row {
        Some(row) => (row.try_get::<i64>("", "cnt")?, row.try_get::<i64>("", "total")?),
        None => (0, 0),
    };
    let summary = summarize(sum, count);

    let result = movie::Entity::update_many()
        .col_expr(movie::Column::AvgRating, Expr::value(summary.avg_rating))
        .col_expr(movie::Column::TotalRating, Expr::value(summary.total_rating))
        .filter(movie::Column::Id.eq(movie_id))
        .exec(conn)
        .await?;
    if result.rows_affected == 0 {
        log::debug!("movie {} vanished before aggregation", movie_id);
        return Ok(None);
    }
    log::debug!(
        "movie {} aggregate avg={} total={}",
        movie_id,
        format_avg(summary.avg_rating),
        summary.total_rating
    );
    Ok(Some(summary))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_set_is_zero() {
        assert_eq!(summarize(0, 0), RatingSummary { avg_rating: 0.0, total_rating: 0 });
        assert_eq!(format_avg(summarize(0, 0).avg_rating), "0.00");
    }

    #[test]
    fn mean_of_ratings() {
        assert_eq!(format_avg(summarize(3 + 5, 2).avg_rating), "4.00");
        assert_eq!(format_avg(summarize(4 + 5, 2).avg_rating), "4.50");
        assert_eq!(summarize(4 + 5, 2).total_rating, 2);
    }

    #[test]
    fn rounds_half_up() {
        // 1,1,2 -> 1.3333
        assert_eq!(format_avg(summarize(4, 3).avg_rating), "1.33");
        // 1,2,2 -> 1.6666
        assert_eq!(format_avg(summarize(5, 3).avg_rating), "1.67");
        // eight ratings summing to 33 -> 4.125
        assert_eq!(format_avg(summarize(33, 8).avg_rating), "4.13");
    }
}
