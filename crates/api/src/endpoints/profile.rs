//! Profile and following endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use storyloom_common::AppResult;
use storyloom_core::{Profile, UpdateProfileInput};

use crate::{
    extractors::{AuthUser, MaybeAuthUser},
    middleware::AppState,
    response::{ApiResponse, UserResponse},
};

const DEFAULT_LIMIT: u64 = 20;
const MAX_LIMIT: u64 = 100;

/// Page of a follower/following list.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub limit: Option<u64>,
    pub until_id: Option<String>,
}

impl PageQuery {
    fn limit(&self) -> u64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }
}

/// A profile as seen by the caller.
#[derive(Serialize)]
pub struct ProfileResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    pub stories_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_following: Option<bool>,
}

impl From<Profile> for ProfileResponse {
    fn from(profile: Profile) -> Self {
        Self {
            user: profile.user.into(),
            stories_count: profile.stories_count,
            is_following: profile.is_following,
        }
    }
}

/// The caller's own profile, with their email.
#[derive(Serialize)]
pub struct MeResponse {
    #[serde(flatten)]
    pub profile: ProfileResponse,
    pub email: String,
}

/// Get the current user's profile.
async fn me(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<MeResponse>> {
    let email = user.email.clone();
    let profile = state.user_service.profile_of(user, None).await?;

    Ok(ApiResponse::ok(MeResponse {
        profile: profile.into(),
        email,
    }))
}

/// Update the current user's profile.
async fn update_me(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<UpdateProfileInput>,
) -> AppResult<ApiResponse<MeResponse>> {
    let updated = state.user_service.update_profile(&user.id, input).await?;
    let email = updated.email.clone();
    let profile = state.user_service.profile_of(updated, None).await?;

    Ok(ApiResponse::ok(MeResponse {
        profile: profile.into(),
        email,
    }))
}

/// Get a user's profile by username.
async fn show(
    viewer: MaybeAuthUser,
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> AppResult<ApiResponse<ProfileResponse>> {
    let profile = state.user_service.profile(&username, viewer.id()).await?;
    Ok(ApiResponse::ok(profile.into()))
}

/// Follow result response.
#[derive(Serialize)]
pub struct FollowResponse {
    pub following: bool,
}

/// Follow a user.
async fn follow(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> AppResult<ApiResponse<FollowResponse>> {
    state.following_service.follow(&user.id, &username).await?;
    Ok(ApiResponse::created(FollowResponse { following: true }))
}

/// Unfollow a user.
async fn unfollow(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> AppResult<ApiResponse<FollowResponse>> {
    state.following_service.unfollow(&user.id, &username).await?;
    Ok(ApiResponse::ok(FollowResponse { following: false }))
}

/// List a user's followers.
async fn followers(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> AppResult<ApiResponse<Vec<UserResponse>>> {
    let users = state
        .following_service
        .followers(&username, query.limit(), query.until_id.as_deref())
        .await?;
    Ok(ApiResponse::ok(users.into_iter().map(Into::into).collect()))
}

/// List the users a user follows.
async fn following(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> AppResult<ApiResponse<Vec<UserResponse>>> {
    let users = state
        .following_service
        .following(&username, query.limit(), query.until_id.as_deref())
        .await?;
    Ok(ApiResponse::ok(users.into_iter().map(Into::into).collect()))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/profile", get(me).patch(update_me))
        .route("/profile/{username}", get(show))
        .route("/follow/{username}", post(follow))
        .route("/unfollow/{username}", post(unfollow))
        .route("/users/{username}/followers", get(followers))
        .route("/users/{username}/following", get(following))
}
