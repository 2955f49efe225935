mod common;

use chrono::Utc;
use common::TestContext;
use movie_rating_backend::aggregate::{lock_movie, recompute, RatingSummary};
use movie_rating_backend::entity::{movie, rating};
use sea_orm::{ActiveModelTrait, ConnectionTrait, EntityTrait, ModelTrait, Set, Statement};

async fn rate(ctx: &TestContext, user_id: i32, movie_id: i32, value: i32) {
    let now = Utc::now();
    rating::ActiveModel {
        user_id: Set(user_id),
        movie_id: Set(movie_id),
        rating: Set(value),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&ctx.db)
    .await
    .expect("Failed to insert rating");
}

#[actix_web::test]
async fn test_recompute_reads_current_ratings() {
    let ctx = TestContext::new().await;
    let (owner, _) = ctx.create_user("owner").await;
    let (ann, _) = ctx.create_user("ann").await;
    let (bob, _) = ctx.create_user("bob").await;
    let (cat, _) = ctx.create_user("cat").await;
    let created = ctx.create_movie(&owner, "Iron Man").await;
    rate(&ctx, ann.id, created.id, 1).await;
    rate(&ctx, bob.id, created.id, 2).await;
    rate(&ctx, cat.id, created.id, 2).await;

    let summary = recompute(&ctx.db, created.id).await.unwrap();
    assert_eq!(
        summary,
        Some(RatingSummary { avg_rating: 1.67, total_rating: 3 })
    );
    let stored = movie::Entity::find_by_id(created.id).one(&ctx.db).await.unwrap().unwrap();
    assert_eq!(stored.total_rating, 3);
    assert!((stored.avg_rating - 1.67).abs() < 1e-9);
}

#[actix_web::test]
async fn test_recompute_failure_leaves_aggregate_untouched() {
    let ctx = TestContext::new().await;
    let (owner, _) = ctx.create_user("owner").await;
    let (ann, _) = ctx.create_user("ann").await;
    let created = ctx.create_movie(&owner, "Iron Man").await;
    rate(&ctx, ann.id, created.id, 4).await;
    recompute(&ctx.db, created.id).await.unwrap();

    ctx.db
        .execute(Statement::from_string(
            ctx.db.get_database_backend(),
            "DROP TABLE t_rating",
        ))
        .await
        .unwrap();
    assert!(recompute(&ctx.db, created.id).await.is_err());

    let stored = movie::Entity::find_by_id(created.id).one(&ctx.db).await.unwrap().unwrap();
    assert_eq!(stored.total_rating, 1);
    assert!((stored.avg_rating - 4.0).abs() < 1e-9);
}

#[actix_web::test]
async fn test_missing_movie_is_left_alone() {
    let ctx = TestContext::new().await;
    assert!(!lock_movie(&ctx.db, 404).await.unwrap());
    assert_eq!(recompute(&ctx.db, 404).await.unwrap(), None);
}

#[actix_web::test]
async fn test_deleted_movie_is_left_alone() {
    let ctx = TestContext::new().await;
    let (owner, _) = ctx.create_user("owner").await;
    let (ann, _) = ctx.create_user("ann").await;
    let created = ctx.create_movie(&owner, "Iron Man").await;
    rate(&ctx, ann.id, created.id, 5).await;
    let movie_id = created.id;
    created.delete(&ctx.db).await.unwrap();

    assert!(!lock_movie(&ctx.db, movie_id).await.unwrap());
    assert_eq!(recompute(&ctx.db, movie_id).await.unwrap(), None);
    assert!(movie::Entity::find_by_id(movie_id).one(&ctx.db).await.unwrap().is_none());
}
