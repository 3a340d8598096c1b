//! API endpoints.

mod auth;
mod chapters;
mod decision_points;
mod profile;
mod stories;

use axum::Router;

use crate::middleware::AppState;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .merge(profile::router())
        .nest(
            "/stories",
            stories::router()
                .merge(chapters::router())
                .merge(decision_points::router()),
        )
}
