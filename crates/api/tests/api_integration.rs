//! API integration tests.
//!
//! Requests go through the full router, including authentication, against a
//! mock database and an in-memory vote store.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use chrono::Utc;
use sea_orm::{DatabaseBackend, MockDatabase};
use serde_json::Value;
use storyloom_api::{AppState, app};
use storyloom_core::{
    ChapterService, DecisionPointService, FollowingService, MemoryVoteStore, StoryService,
    UserService, VotingEngine,
};
use storyloom_db::entities::{chapter, choice, decision_point, story, user};
use storyloom_db::repositories::{
    ChapterRepository, ChoiceRepository, DecisionPointRepository, FollowingRepository,
    StoryRepository, UserRepository,
};
use tower::ServiceExt;

fn create_test_user(id: &str) -> user::Model {
    user::Model {
        id: id.to_string(),
        username: id.to_string(),
        username_lower: id.to_lowercase(),
        email: format!("{id}@example.com"),
        token: Some(format!("{id}-token")),
        password_hash: "x".to_string(),
        name: None,
        bio: None,
        avatar_url: None,
        followers_count: 0,
        following_count: 0,
        created_at: Utc::now().into(),
        updated_at: None,
    }
}

fn create_test_story() -> story::Model {
    story::Model {
        id: "s1".to_string(),
        slug: "tale".to_string(),
        author_id: "alice".to_string(),
        title: "Tale".to_string(),
        description: "A tale".to_string(),
        content: String::new(),
        cover_image_url: None,
        category: Some("fantasy".to_string()),
        is_active: true,
        is_published: true,
        likes_count: 0,
        shares_count: 0,
        created_at: Utc::now().into(),
        updated_at: None,
    }
}

fn create_test_chapter() -> chapter::Model {
    chapter::Model {
        id: "ch1".to_string(),
        story_id: "s1".to_string(),
        title: "One".to_string(),
        content: String::new(),
        order: 1,
        created_at: Utc::now().into(),
        updated_at: None,
    }
}

fn create_test_dp() -> decision_point::Model {
    decision_point::Model {
        id: "dp1".to_string(),
        chapter_id: "ch1".to_string(),
        question: "Which way?".to_string(),
        created_at: Utc::now().into(),
        expires_at: None,
        is_active: true,
    }
}

fn create_test_choice(id: &str) -> choice::Model {
    choice::Model {
        id: id.to_string(),
        decision_point_id: "dp1".to_string(),
        text: id.to_string(),
        votes: 0,
        created_at: Utc::now().into(),
    }
}

/// Create the test router over a mock database and a vote store.
fn create_test_router(db: MockDatabase, store: MemoryVoteStore) -> Router {
    let db = Arc::new(db.into_connection());

    let user_repo = UserRepository::new(Arc::clone(&db));
    let following_repo = FollowingRepository::new(Arc::clone(&db));
    let story_repo = StoryRepository::new(Arc::clone(&db));

    let story_service = StoryService::new(story_repo.clone(), user_repo.clone());
    let engine = VotingEngine::with_timeout(Arc::new(store), Duration::from_secs(5));

    let state = AppState {
        user_service: UserService::new(
            user_repo.clone(),
            following_repo.clone(),
            story_repo.clone(),
        ),
        following_service: FollowingService::new(following_repo, user_repo),
        chapter_service: ChapterService::new(
            ChapterRepository::new(Arc::clone(&db)),
            story_service.clone(),
        ),
        decision_point_service: DecisionPointService::new(
            story_service.clone(),
            ChapterRepository::new(Arc::clone(&db)),
            DecisionPointRepository::new(Arc::clone(&db)),
            ChoiceRepository::new(Arc::clone(&db)),
            engine,
        ),
        story_service,
    };

    app(state)
}

fn empty_db() -> MockDatabase {
    MockDatabase::new(DatabaseBackend::Postgres)
}

/// A mock database whose first query resolves the bearer token.
fn authed_db(user_id: &str) -> MockDatabase {
    empty_db().append_query_results([[create_test_user(user_id)]])
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .uri(uri)
        .method(method)
        .header("Content-Type", "application/json");
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_unknown_endpoint_returns_404() {
    let app = create_test_router(empty_db(), MemoryVoteStore::new());

    let response = app
        .oneshot(json_request("GET", "/api/nonexistent", None, ""))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_profile_requires_auth() {
    let app = create_test_router(empty_db(), MemoryVoteStore::new());

    let response = app
        .oneshot(json_request("GET", "/api/profile", None, ""))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_unknown_token_is_anonymous() {
    let db = empty_db().append_query_results([Vec::<user::Model>::new()]);
    let app = create_test_router(db, MemoryVoteStore::new());

    let response = app
        .oneshot(json_request("POST", "/api/auth/signout", Some("bogus"), ""))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_validates_password() {
    let app = create_test_router(empty_db(), MemoryVoteStore::new());

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/auth/register",
            None,
            r#"{"username":"alice","email":"alice@example.com","password":"short"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_me_hides_credentials() {
    let db = authed_db("alice").append_query_results([[std::collections::BTreeMap::from([(
        "num_items",
        sea_orm::Value::BigInt(Some(2)),
    )])]]);
    let app = create_test_router(db, MemoryVoteStore::new());

    let response = app
        .oneshot(json_request("GET", "/api/profile", Some("alice-token"), ""))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["username"], "alice");
    assert_eq!(body["data"]["email"], "alice@example.com");
    assert_eq!(body["data"]["stories_count"], 2);
    assert!(body["data"].get("token").is_none());
    assert!(body["data"].get("password_hash").is_none());
}

#[tokio::test]
async fn test_list_stories() {
    let db = empty_db().append_query_results([[create_test_story()]]);
    let app = create_test_router(db, MemoryVoteStore::new());

    let response = app
        .oneshot(json_request("GET", "/api/stories?category=fantasy", None, ""))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"][0]["slug"], "tale");
}

#[tokio::test]
async fn test_share_unknown_platform() {
    let app = create_test_router(authed_db("bob"), MemoryVoteStore::new());

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/stories/tale/share",
            Some("bob-token"),
            r#"{"platform":"myspace"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_story_by_stranger_forbidden() {
    let db = authed_db("bob").append_query_results([[create_test_story()]]);
    let app = create_test_router(db, MemoryVoteStore::new());

    let response = app
        .oneshot(json_request(
            "PATCH",
            "/api/stories/tale",
            Some("bob-token"),
            r#"{"title":"Mine now"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

fn vote_db(choice_id: &str) -> MockDatabase {
    authed_db("bob")
        .append_query_results([[create_test_story()]])
        .append_query_results([[create_test_chapter()]])
        .append_query_results([[create_test_dp()]])
        .append_query_results([[create_test_choice(choice_id)]])
}

async fn vote_store() -> MemoryVoteStore {
    let store = MemoryVoteStore::new();
    store.insert_decision_point("dp1", "alice").await;
    store.insert_choice("a", "dp1").await;
    store.insert_choice("b", "dp1").await;
    store
}

const VOTE_URI: &str = "/api/stories/tale/chapters/ch1/decision-points/dp1/vote";

#[tokio::test]
async fn test_vote_created() {
    let store = vote_store().await;
    let app = create_test_router(vote_db("a"), store.clone());

    let response = app
        .oneshot(json_request(
            "POST",
            VOTE_URI,
            Some("bob-token"),
            r#"{"choice":"a"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["data"]["votes"], 1);
    assert_eq!(body["data"]["decision_point_id"], "dp1");
    assert_eq!(store.votes("a").await, Some(1));
}

#[tokio::test]
async fn test_second_vote_conflicts() {
    let store = vote_store().await;

    let first = create_test_router(vote_db("a"), store.clone())
        .oneshot(json_request(
            "POST",
            VOTE_URI,
            Some("bob-token"),
            r#"{"choice":"a"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = create_test_router(vote_db("b"), store.clone())
        .oneshot(json_request(
            "POST",
            VOTE_URI,
            Some("bob-token"),
            r#"{"choice_id":"b"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(second.status(), StatusCode::CONFLICT);
    let body = body_json(second).await;
    assert_eq!(body["error"]["code"], "ALREADY_VOTED");
    assert_eq!(store.votes("b").await, Some(0));
}

#[tokio::test]
async fn test_vote_on_inactive_decision_point() {
    let store = vote_store().await;
    let deactivate_db = authed_db("alice")
        .append_query_results([[create_test_story()]])
        .append_query_results([[create_test_chapter()]])
        .append_query_results([[create_test_dp()]]);

    let response = create_test_router(deactivate_db, store.clone())
        .oneshot(json_request(
            "POST",
            "/api/stories/tale/chapters/ch1/decision-points/dp1/deactivate",
            Some("alice-token"),
            "",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(store.is_active("dp1").await, Some(false));

    let response = create_test_router(vote_db("a"), store.clone())
        .oneshot(json_request(
            "POST",
            VOTE_URI,
            Some("bob-token"),
            r#"{"choice":"a"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "DECISION_POINT_INACTIVE");
}

#[tokio::test]
async fn test_deactivate_by_reader_forbidden() {
    let store = vote_store().await;
    let db = authed_db("bob")
        .append_query_results([[create_test_story()]])
        .append_query_results([[create_test_chapter()]])
        .append_query_results([[create_test_dp()]]);

    let response = create_test_router(db, store.clone())
        .oneshot(json_request(
            "POST",
            "/api/stories/tale/chapters/ch1/decision-points/dp1/deactivate",
            Some("bob-token"),
            "",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(store.is_active("dp1").await, Some(true));
}

#[tokio::test]
async fn test_vote_without_auth() {
    let app = create_test_router(empty_db(), vote_store().await);

    let response = app
        .oneshot(json_request("POST", VOTE_URI, None, r#"{"choice":"a"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
