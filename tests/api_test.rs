use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use noticeboard::{
    api::{self, middleware::actor::{ACTOR_ID_HEADER, ACTOR_ROLE_HEADER}},
    repository::InstitutionDirectory,
    service::ServiceContext,
    visibility::NoticePolicy,
};
use serde_json::{json, Value};
use sqlx::sqlite::SqlitePoolOptions;
use tower::ServiceExt;
use uuid::Uuid;

async fn app() -> anyhow::Result<(Router, Arc<ServiceContext>)> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await?;

    let context = Arc::new(ServiceContext::new(pool, NoticePolicy::default()));
    let router = api::create_app(context.clone());
    Ok((router, context))
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    actor: Option<(&str, Uuid)>,
    body: Option<Value>,
) -> anyhow::Result<(StatusCode, Value)> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some((role, id)) = actor {
        builder = builder
            .header(ACTOR_ROLE_HEADER, role)
            .header(ACTOR_ID_HEADER, id.to_string());
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&json)?))?,
        None => builder.body(Body::empty())?,
    };

    let response = app.clone().oneshot(request).await?;
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)?
    };
    Ok((status, value))
}

#[tokio::test]
async fn test_health_needs_no_actor() -> anyhow::Result<()> {
    let (app, _) = app().await?;
    let (status, body) = send(&app, Method::GET, "/health", None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    Ok(())
}

#[tokio::test]
async fn test_missing_actor_is_unauthorized() -> anyhow::Result<()> {
    let (app, _) = app().await?;
    let (status, body) = send(&app, Method::GET, "/api/notices/feed", None, None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "UNAUTHORIZED");
    Ok(())
}

#[tokio::test]
async fn test_notice_lifecycle_over_http() -> anyhow::Result<()> {
    let (app, context) = app().await?;
    let system = Uuid::new_v4();
    let student = Uuid::new_v4();

    let institution = context.institution_directory.create_institution("Riverside").await?;
    let admin = Uuid::new_v4();
    context.institution_directory.assign_admin(admin, Some(institution.id)).await?;

    let (status, created) = send(
        &app,
        Method::POST,
        "/api/system/notices",
        Some(("SYSTEM_ADMIN", system)),
        Some(json!({
            "title": "Exam Notice",
            "content": "All students must arrive by 9am sharp today.",
            "audience": "STUDENT",
            "category": "GENERAL"
        })),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["created_by_system_admin_id"], json!(system));
    assert!(created["institution_id"].is_null());
    let system_notice = created["id"].as_str().unwrap_or_default().to_string();

    let (status, created) = send(
        &app,
        Method::POST,
        "/api/institution/notices",
        Some(("INSTITUTION_ADMIN", admin)),
        Some(json!({
            "title": "Result Day",
            "content": "Results published on the portal this week."
        })),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["audience"], "BOTH");
    assert_eq!(created["category"], "ACADEMIC");
    assert_eq!(created["institution_id"], json!(institution.id));
    let institution_notice = created["id"].as_str().unwrap_or_default().to_string();

    let (status, feed) =
        send(&app, Method::GET, "/api/notices/feed", Some(("STUDENT", student)), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(feed.as_array().map(Vec::len), Some(2));

    let (status, feed) = send(
        &app,
        Method::GET,
        "/api/notices/feed",
        Some(("INSTITUTION_ADMIN", admin)),
        None,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    let feed_ids: Vec<&str> = feed
        .as_array()
        .map(|a| a.iter().filter_map(|n| n["id"].as_str()).collect())
        .unwrap_or_default();
    assert_eq!(feed_ids, vec![institution_notice.as_str()]);

    let (status, mine) = send(
        &app,
        Method::GET,
        "/api/notices/mine?audience=student&search=EXAM",
        Some(("SYSTEM_ADMIN", system)),
        None,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine.as_array().map(Vec::len), Some(1));

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/notices/mine?audience=everyone",
        Some(("SYSTEM_ADMIN", system)),
        None,
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION");

    let (status, updated) = send(
        &app,
        Method::PUT,
        &format!("/api/notices/{}", system_notice),
        Some(("SYSTEM_ADMIN", system)),
        Some(json!({ "published": false })),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["published"], false);
    assert_eq!(updated["title"], "Exam Notice");

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/api/notices/{}", system_notice),
        Some(("STUDENT", student)),
        None,
    )
    .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NOT_FOUND");

    let (status, body) = send(
        &app,
        Method::DELETE,
        &format!("/api/notices/{}", institution_notice),
        Some(("SYSTEM_ADMIN", system)),
        None,
    )
    .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NOT_FOUND");

    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/api/notices/{}", institution_notice),
        Some(("INSTITUTION_ADMIN", admin)),
        None,
    )
    .await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/api/notices/{}", institution_notice),
        Some(("INSTITUTION_ADMIN", admin)),
        None,
    )
    .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn test_failure_kinds_over_http() -> anyhow::Result<()> {
    let (app, _) = app().await?;
    let orphan_admin = Uuid::new_v4();

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/institution/notices",
        Some(("INSTITUTION_ADMIN", orphan_admin)),
        Some(json!({
            "title": "Result Day",
            "content": "Results published on the portal this week."
        })),
    )
    .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "FORBIDDEN");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/system/notices",
        Some(("SYSTEM_ADMIN", Uuid::new_v4())),
        Some(json!({ "title": "Hi", "content": "Too short", "audience": "BOTH" })),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/system/notices",
        Some(("STUDENT", Uuid::new_v4())),
        Some(json!({
            "title": "Exam Notice",
            "content": "All students must arrive by 9am sharp today.",
            "audience": "BOTH"
        })),
    )
    .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "FORBIDDEN");

    Ok(())
}
