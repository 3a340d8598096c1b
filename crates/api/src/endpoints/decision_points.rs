//! Decision point, choice and voting endpoints.
//!
//! All routes live under `/stories/{slug}/chapters/{chapter_id}`.

use axum::{
    Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use storyloom_common::AppResult;
use storyloom_core::{
    CreateChoiceInput, CreateDecisionPointInput, DecisionPointWithChoices,
    UpdateDecisionPointInput, VoteResult,
};
use storyloom_db::entities::{choice, decision_point};

use crate::{
    extractors::{AuthUser, MaybeAuthUser},
    middleware::AppState,
    response::{ApiResponse, no_content},
};

#[derive(Debug, Deserialize)]
pub struct DecisionPointPath {
    pub slug: String,
    pub chapter_id: String,
    pub dp_id: String,
}

async fn list(
    viewer: MaybeAuthUser,
    State(state): State<AppState>,
    Path((slug, chapter_id)): Path<(String, String)>,
) -> AppResult<ApiResponse<Vec<DecisionPointWithChoices>>> {
    let list = state
        .decision_point_service
        .list(&slug, &chapter_id, viewer.id())
        .await?;
    Ok(ApiResponse::ok(list))
}

async fn create(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path((slug, chapter_id)): Path<(String, String)>,
    Json(input): Json<CreateDecisionPointInput>,
) -> AppResult<ApiResponse<decision_point::Model>> {
    let dp = state
        .decision_point_service
        .create(&user.id, &slug, &chapter_id, input)
        .await?;
    Ok(ApiResponse::created(dp))
}

async fn show(
    viewer: MaybeAuthUser,
    State(state): State<AppState>,
    Path(path): Path<DecisionPointPath>,
) -> AppResult<ApiResponse<DecisionPointWithChoices>> {
    let dp = state
        .decision_point_service
        .get(&path.slug, &path.chapter_id, &path.dp_id, viewer.id())
        .await?;
    Ok(ApiResponse::ok(dp))
}

async fn update(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(path): Path<DecisionPointPath>,
    Json(input): Json<UpdateDecisionPointInput>,
) -> AppResult<ApiResponse<decision_point::Model>> {
    let dp = state
        .decision_point_service
        .update(&user.id, &path.slug, &path.chapter_id, &path.dp_id, input)
        .await?;
    Ok(ApiResponse::ok(dp))
}

async fn delete(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(path): Path<DecisionPointPath>,
) -> AppResult<impl IntoResponse> {
    state
        .decision_point_service
        .delete(&user.id, &path.slug, &path.chapter_id, &path.dp_id)
        .await?;
    Ok(no_content())
}

#[derive(Serialize)]
pub struct DeactivateResponse {
    pub is_active: bool,
}

async fn deactivate(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(path): Path<DecisionPointPath>,
) -> AppResult<ApiResponse<DeactivateResponse>> {
    state
        .decision_point_service
        .deactivate(&user.id, &path.slug, &path.chapter_id, &path.dp_id)
        .await?;
    Ok(ApiResponse::ok(DeactivateResponse { is_active: false }))
}

async fn list_choices(
    viewer: MaybeAuthUser,
    State(state): State<AppState>,
    Path(path): Path<DecisionPointPath>,
) -> AppResult<ApiResponse<Vec<choice::Model>>> {
    let choices = state
        .decision_point_service
        .list_choices(&path.slug, &path.chapter_id, &path.dp_id, viewer.id())
        .await?;
    Ok(ApiResponse::ok(choices))
}

async fn add_choice(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(path): Path<DecisionPointPath>,
    Json(input): Json<CreateChoiceInput>,
) -> AppResult<ApiResponse<choice::Model>> {
    let choice = state
        .decision_point_service
        .add_choice(&user.id, &path.slug, &path.chapter_id, &path.dp_id, input)
        .await?;
    Ok(ApiResponse::created(choice))
}

/// Vote request.
#[derive(Debug, Deserialize)]
pub struct CastVoteRequest {
    /// Choice ID.
    #[serde(alias = "choice_id")]
    pub choice: String,
}

async fn vote(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(path): Path<DecisionPointPath>,
    Json(req): Json<CastVoteRequest>,
) -> AppResult<ApiResponse<VoteResult>> {
    let result = state
        .decision_point_service
        .vote(
            &user.id,
            &path.slug,
            &path.chapter_id,
            &path.dp_id,
            &req.choice,
        )
        .await?;
    Ok(ApiResponse::created(result))
}

pub fn router() -> Router<AppState> {
    let base = "/{slug}/chapters/{chapter_id}/decision-points";

    Router::new()
        .route(base, get(list).post(create))
        .route(
            &format!("{base}/{{dp_id}}"),
            get(show).patch(update).delete(delete),
        )
        .route(&format!("{base}/{{dp_id}}/deactivate"), post(deactivate))
        .route(
            &format!("{base}/{{dp_id}}/choices"),
            get(list_choices).post(add_choice),
        )
        .route(&format!("{base}/{{dp_id}}/vote"), post(vote))
}
