mod common;

use actix_web::{http::StatusCode, test};
use common::{bearer, TestContext};
use movie_rating_backend::entity::reported_movie;
use movie_rating_backend::token::TokenPair;
use sea_orm::EntityTrait;
use serde_json::{json, Value};

#[actix_web::test]
async fn test_report_list_is_scoped_to_reporter() {
    let ctx = TestContext::new().await;
    let app = test::init_service(ctx.create_app()).await;
    let (owner, _) = ctx.create_user("owner").await;
    let (ann, ann_tokens) = ctx.create_user("ann").await;
    let (_, bob_tokens) = ctx.create_user("bob").await;
    let (_, admin_tokens) = ctx.create_admin("root").await;
    let created = ctx.create_movie(&owner, "Iron Man").await;

    for tokens in [&ann_tokens, &bob_tokens] {
        let req = test::TestRequest::post()
            .uri("/api/v1/movie/report-movie/")
            .insert_header(bearer(tokens))
            .set_json(json!({ "movie": created.id, "reason": "Spoilers in the description" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Report submitted");
    }

    let list = |tokens: &TokenPair| {
        test::TestRequest::get()
            .uri("/api/v1/movie/reported-movie-list/")
            .insert_header(bearer(tokens))
            .to_request()
    };
    let body: Value = test::read_body_json(test::call_service(&app, list(&ann_tokens)).await).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["results"][0]["reported_by"], ann.id);
    assert_eq!(body["results"][0]["acknowledged"], false);
    assert_eq!(body["results"][0]["admin_approval"], "PENDING");

    let body: Value = test::read_body_json(test::call_service(&app, list(&admin_tokens)).await).await;
    assert_eq!(body["count"], 2);
}

#[actix_web::test]
async fn test_report_requires_existing_movie_and_reason() {
    let ctx = TestContext::new().await;
    let app = test::init_service(ctx.create_app()).await;
    let (_, tokens) = ctx.create_user("ann").await;

    let req = test::TestRequest::post()
        .uri("/api/v1/movie/report-movie/")
        .insert_header(bearer(&tokens))
        .set_json(json!({ "movie": 42 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["movie"][0], "Invalid pk \"42\" - object does not exist.");
    assert_eq!(body["reason"][0], "This field is required.");
}

#[actix_web::test]
async fn test_only_admin_reviews_reports() {
    let ctx = TestContext::new().await;
    let app = test::init_service(ctx.create_app()).await;
    let (owner, _) = ctx.create_user("owner").await;
    let (_, ann_tokens) = ctx.create_user("ann").await;
    let (_, admin_tokens) = ctx.create_admin("root").await;
    let created = ctx.create_movie(&owner, "Iron Man").await;

    let req = test::TestRequest::post()
        .uri("/api/v1/movie/report-movie/")
        .insert_header(bearer(&ann_tokens))
        .set_json(json!({ "movie": created.id, "reason": "Wrong release date" }))
        .to_request();
    test::call_service(&app, req).await;
    let report = reported_movie::Entity::find().one(&ctx.db).await.unwrap().unwrap();
    let uri = format!("/api/v1/movie/review-report/{}/", report.id);

    let req = test::TestRequest::put()
        .uri(&uri)
        .insert_header(bearer(&ann_tokens))
        .set_json(json!({ "admin_approval": "APPROVED" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_ACCEPTABLE);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Report acknowledgement can only be modified by an Admin");

    let req = test::TestRequest::put()
        .uri(&uri)
        .insert_header(bearer(&admin_tokens))
        .set_json(json!({ "admin_approval": "MAYBE" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let unchanged = reported_movie::Entity::find_by_id(report.id).one(&ctx.db).await.unwrap().unwrap();
    assert!(!unchanged.acknowledged);

    let req = test::TestRequest::put()
        .uri(&uri)
        .insert_header(bearer(&admin_tokens))
        .set_json(json!({ "admin_approval": "APPROVED" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::ACCEPTED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Report updated");

    let reviewed = reported_movie::Entity::find_by_id(report.id).one(&ctx.db).await.unwrap().unwrap();
    assert!(reviewed.acknowledged);
    assert_eq!(reviewed.admin_approval, "APPROVED");

    let req = test::TestRequest::put()
        .uri("/api/v1/movie/review-report/999/")
        .insert_header(bearer(&admin_tokens))
        .set_json(json!({}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Invalid id");
}
