//! Story repository, including likes and shares.

use std::sync::Arc;

use crate::entities::{Story, StoryLike, StoryShare, story, story_like, story_share};
use crate::map_insert_err;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    sea_query::{Expr, Func, OnConflict, SimpleExpr},
};
use storyloom_common::{AppError, AppResult};

/// Filters for listing published stories.
#[derive(Debug, Clone, Default)]
pub struct StoryFilter {
    /// Only stories by this author.
    pub author_id: Option<String>,
    /// Exact category match.
    pub category: Option<String>,
    /// Case-insensitive substring of the title or description.
    pub search: Option<String>,
    /// Page size.
    pub limit: u64,
    /// Only stories with an ID below this one.
    pub until_id: Option<String>,
}

/// Story repository for database operations.
#[derive(Clone)]
pub struct StoryRepository {
    db: Arc<DatabaseConnection>,
}

impl StoryRepository {
    /// Create a new story repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a story by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<story::Model>> {
        Story::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a story by slug, published or not.
    pub async fn find_by_slug(&self, slug: &str) -> AppResult<Option<story::Model>> {
        Story::find()
            .filter(story::Column::Slug.eq(slug))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Check whether any story uses the slug.
    pub async fn slug_exists(&self, slug: &str) -> AppResult<bool> {
        let count = Story::find()
            .filter(story::Column::Slug.eq(slug))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(count > 0)
    }

    /// Create a new story.
    pub async fn create(&self, model: story::ActiveModel) -> AppResult<story::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| map_insert_err(e, "Slug is already taken"))
    }

    /// Update a story.
    pub async fn update(&self, model: story::ActiveModel) -> AppResult<story::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a story. Chapters and everything below them cascade.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        Story::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// List published stories, newest first.
    pub async fn list(&self, filter: &StoryFilter) -> AppResult<Vec<story::Model>> {
        let mut condition = Condition::all().add(story::Column::IsPublished.eq(true));

        if let Some(author_id) = &filter.author_id {
            condition = condition.add(story::Column::AuthorId.eq(author_id.as_str()));
        }
        if let Some(category) = &filter.category {
            condition = condition.add(story::Column::Category.eq(category.as_str()));
        }
        if let Some(search) = &filter.search {
            let pattern = format!(
                "%{}%",
                search
                    .to_lowercase()
                    .replace('%', "\\%")
                    .replace('_', "\\_")
            );
            condition = condition.add(
                Condition::any()
                    .add(lower(story::Column::Title).like(pattern.clone()))
                    .add(lower(story::Column::Description).like(pattern)),
            );
        }
        if let Some(until_id) = &filter.until_id {
            condition = condition.add(story::Column::Id.lt(until_id.as_str()));
        }

        Story::find()
            .filter(condition)
            .order_by_desc(story::Column::Id)
            .limit(filter.limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count published stories by an author.
    pub async fn count_by_author(&self, author_id: &str) -> AppResult<u64> {
        Story::find()
            .filter(story::Column::AuthorId.eq(author_id))
            .filter(story::Column::IsPublished.eq(true))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Check if a user has liked a story.
    pub async fn is_liked(&self, story_id: &str, user_id: &str) -> AppResult<bool> {
        let count = StoryLike::find()
            .filter(story_like::Column::StoryId.eq(story_id))
            .filter(story_like::Column::UserId.eq(user_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(count > 0)
    }

    /// Insert a like unless the user already likes the story.
    ///
    /// Returns whether a row was inserted.
    pub async fn insert_like(&self, model: story_like::ActiveModel) -> AppResult<bool> {
        let result = StoryLike::insert(model)
            .on_conflict(
                OnConflict::columns([story_like::Column::StoryId, story_like::Column::UserId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(self.db.as_ref())
            .await;
        inserted(result)
    }

    /// Remove a like. Returns whether a row was removed.
    pub async fn delete_like(&self, story_id: &str, user_id: &str) -> AppResult<bool> {
        let result = StoryLike::delete_many()
            .filter(story_like::Column::StoryId.eq(story_id))
            .filter(story_like::Column::UserId.eq(user_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected > 0)
    }

    /// Insert a share unless one exists for (story, user, platform).
    ///
    /// Returns whether a row was inserted.
    pub async fn insert_share(&self, model: story_share::ActiveModel) -> AppResult<bool> {
        let result = StoryShare::insert(model)
            .on_conflict(
                OnConflict::columns([
                    story_share::Column::StoryId,
                    story_share::Column::UserId,
                    story_share::Column::Platform,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(self.db.as_ref())
            .await;
        inserted(result)
    }

    /// Increment likes count atomically (single UPDATE query, no fetch).
    pub async fn increment_likes_count(&self, story_id: &str) -> AppResult<()> {
        self.adjust_count(
            story_id,
            story::Column::LikesCount,
            Expr::col(story::Column::LikesCount).add(1),
        )
        .await
    }

    /// Decrement likes count atomically, never below zero.
    pub async fn decrement_likes_count(&self, story_id: &str) -> AppResult<()> {
        self.adjust_count(
            story_id,
            story::Column::LikesCount,
            Expr::cust("GREATEST(likes_count - 1, 0)"),
        )
        .await
    }

    /// Increment shares count atomically (single UPDATE query, no fetch).
    pub async fn increment_shares_count(&self, story_id: &str) -> AppResult<()> {
        self.adjust_count(
            story_id,
            story::Column::SharesCount,
            Expr::col(story::Column::SharesCount).add(1),
        )
        .await
    }

    async fn adjust_count(
        &self,
        story_id: &str,
        column: story::Column,
        value: SimpleExpr,
    ) -> AppResult<()> {
        Story::update_many()
            .col_expr(column, value)
            .filter(story::Column::Id.eq(story_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}

fn lower(column: story::Column) -> Expr {
    Expr::expr(Func::lower(Expr::col(column)))
}

fn inserted(result: Result<u64, DbErr>) -> AppResult<bool> {
    match result {
        Ok(rows) => Ok(rows > 0),
        Err(DbErr::RecordNotInserted) => Ok(false),
        Err(e) if crate::is_unique_violation(&e) => Ok(false),
        Err(e) => Err(AppError::Database(e.to_string())),
    }
}
