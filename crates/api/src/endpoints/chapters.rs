//! Chapter endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
};
use storyloom_common::AppResult;
use storyloom_core::{CreateChapterInput, UpdateChapterInput};
use storyloom_db::entities::chapter;

use crate::{
    extractors::{AuthUser, MaybeAuthUser},
    middleware::AppState,
    response::{ApiResponse, no_content},
};

async fn list(
    viewer: MaybeAuthUser,
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<ApiResponse<Vec<chapter::Model>>> {
    let chapters = state.chapter_service.list(&slug, viewer.id()).await?;
    Ok(ApiResponse::ok(chapters))
}

async fn create(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(input): Json<CreateChapterInput>,
) -> AppResult<ApiResponse<chapter::Model>> {
    let chapter = state.chapter_service.create(&user.id, &slug, input).await?;
    Ok(ApiResponse::created(chapter))
}

async fn show(
    viewer: MaybeAuthUser,
    State(state): State<AppState>,
    Path((slug, chapter_id)): Path<(String, String)>,
) -> AppResult<ApiResponse<chapter::Model>> {
    let chapter = state
        .chapter_service
        .get(&slug, &chapter_id, viewer.id())
        .await?;
    Ok(ApiResponse::ok(chapter))
}

async fn update(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path((slug, chapter_id)): Path<(String, String)>,
    Json(input): Json<UpdateChapterInput>,
) -> AppResult<ApiResponse<chapter::Model>> {
    let chapter = state
        .chapter_service
        .update(&user.id, &slug, &chapter_id, input)
        .await?;
    Ok(ApiResponse::ok(chapter))
}

async fn delete(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path((slug, chapter_id)): Path<(String, String)>,
) -> AppResult<impl IntoResponse> {
    state
        .chapter_service
        .delete(&user.id, &slug, &chapter_id)
        .await?;
    Ok(no_content())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{slug}/chapters", get(list).post(create))
        .route(
            "/{slug}/chapters/{chapter_id}",
            get(show).patch(update).delete(delete),
        )
}
