//! Story endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use storyloom_common::AppResult;
use storyloom_core::{
    CreateStoryInput, LikeResult, ShareResult, StoryListQuery, StoryView, UpdateStoryInput,
};
use storyloom_db::entities::story;

use crate::{
    extractors::{AuthUser, MaybeAuthUser},
    middleware::AppState,
    response::{ApiResponse, no_content},
};

/// List published stories.
async fn list(
    State(state): State<AppState>,
    Query(query): Query<StoryListQuery>,
) -> AppResult<ApiResponse<Vec<story::Model>>> {
    let stories = state.story_service.list(query).await?;
    Ok(ApiResponse::ok(stories))
}

/// Create a story.
async fn create(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateStoryInput>,
) -> AppResult<ApiResponse<story::Model>> {
    let story = state.story_service.create(&user.id, input).await?;
    Ok(ApiResponse::created(story))
}

/// Get a story by slug.
async fn show(
    viewer: MaybeAuthUser,
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<ApiResponse<StoryView>> {
    let view = state.story_service.get_by_slug(&slug, viewer.id()).await?;
    Ok(ApiResponse::ok(view))
}

/// Update a story.
async fn update(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(input): Json<UpdateStoryInput>,
) -> AppResult<ApiResponse<story::Model>> {
    let story = state.story_service.update(&user.id, &slug, input).await?;
    Ok(ApiResponse::ok(story))
}

/// Delete a story.
async fn delete(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<impl IntoResponse> {
    state.story_service.delete(&user.id, &slug).await?;
    Ok(no_content())
}

/// Like a story, or take the like back.
async fn like(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<ApiResponse<LikeResult>> {
    let result = state.story_service.toggle_like(&user.id, &slug).await?;
    Ok(ApiResponse::ok(result))
}

/// Share request.
#[derive(Debug, Deserialize)]
pub struct ShareRequest {
    pub platform: String,
}

/// Share a story. 201 the first time per platform, 200 afterwards.
async fn share(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(req): Json<ShareRequest>,
) -> AppResult<(StatusCode, ApiResponse<ShareResult>)> {
    let result = state
        .story_service
        .share(&user.id, &slug, &req.platform)
        .await?;

    let status = if result.shared {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, ApiResponse::ok(result)))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{slug}", get(show).patch(update).delete(delete))
        .route("/{slug}/like", post(like))
        .route("/{slug}/share", post(share))
}
