//! Authentication endpoints.

use axum::{Json, Router, extract::State, routing::post};
use serde::{Deserialize, Serialize};
use storyloom_common::AppResult;
use storyloom_core::{AuthSession, SignupInput};

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Signin request.
#[derive(Debug, Deserialize)]
pub struct SigninRequest {
    pub username: String,
    pub password: String,
}

/// Token response for signup and signin.
#[derive(Serialize)]
pub struct TokenResponse {
    pub id: String,
    pub username: String,
    pub token: String,
}

impl From<AuthSession> for TokenResponse {
    fn from(session: AuthSession) -> Self {
        Self {
            id: session.user.id,
            username: session.user.username,
            token: session.token,
        }
    }
}

/// Create a new user account.
async fn register(
    State(state): State<AppState>,
    Json(input): Json<SignupInput>,
) -> AppResult<ApiResponse<TokenResponse>> {
    let session = state.user_service.signup(input).await?;
    Ok(ApiResponse::created(session.into()))
}

/// Exchange credentials for a token.
async fn token(
    State(state): State<AppState>,
    Json(req): Json<SigninRequest>,
) -> AppResult<ApiResponse<TokenResponse>> {
    let session = state
        .user_service
        .signin(&req.username, &req.password)
        .await?;
    Ok(ApiResponse::ok(session.into()))
}

/// Regenerate token response.
#[derive(Serialize)]
pub struct RegenerateTokenResponse {
    pub token: String,
}

/// Regenerate the authentication token.
async fn regenerate_token(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<RegenerateTokenResponse>> {
    let token = state.user_service.regenerate_token(&user.id).await?;
    Ok(ApiResponse::ok(RegenerateTokenResponse { token }))
}

/// Signout response.
#[derive(Serialize)]
pub struct SignoutResponse {
    pub ok: bool,
}

/// Sign out, revoking the current token.
async fn signout(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<SignoutResponse>> {
    state.user_service.signout(&user.id).await?;
    Ok(ApiResponse::ok(SignoutResponse { ok: true }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/token", post(token))
        .route("/signout", post(signout))
        .route("/regenerate-token", post(regenerate_token))
}
