//! Story ownership checks.
//!
//! Every mutation below a story (the story itself, its chapters, decision
//! points and choices, and decision point deactivation) is allowed only for
//! the story's author, and goes through [`ensure_author`].

use storyloom_common::{AppError, AppResult};
use storyloom_db::entities::story;

/// Something owned by a story author.
pub trait Authored {
    /// ID of the owning story's author.
    fn author_id(&self) -> &str;
}

impl Authored for story::Model {
    fn author_id(&self) -> &str {
        &self.author_id
    }
}

/// Whether `user_id` authored `resource`.
#[must_use]
pub fn is_author<R: Authored + ?Sized>(resource: &R, user_id: &str) -> bool {
    resource.author_id() == user_id
}

/// Fail with [`AppError::Forbidden`] unless `user_id` authored `resource`.
pub fn ensure_author<R: Authored + ?Sized>(
    resource: &R,
    user_id: &str,
    action: &str,
) -> AppResult<()> {
    if is_author(resource, user_id) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "Only the story author can {action}"
        )))
    }
}
