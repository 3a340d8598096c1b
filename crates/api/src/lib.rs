//! HTTP API layer for storyloom.
//!
//! - **Endpoints**: accounts, profiles and follows, stories, chapters,
//!   decision points and voting
//! - **Extractors**: [`AuthUser`](extractors::AuthUser) and
//!   [`MaybeAuthUser`](extractors::MaybeAuthUser)
//! - **Middleware**: bearer token authentication
//!
//! Built on Axum 0.8; the server adds the Tower layers.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;

use axum::{Router, middleware::from_fn_with_state};

pub use endpoints::router;
pub use middleware::AppState;

/// The API mounted under `/api`, with authentication applied.
pub fn app(state: AppState) -> Router {
    Router::new()
        .nest("/api", router())
        .layer(from_fn_with_state(state.clone(), middleware::auth_middleware))
        .with_state(state)
}
