//! Chapter repository.

use std::sync::Arc;

use crate::entities::{Chapter, chapter};
use crate::map_insert_err;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
};
use storyloom_common::{AppError, AppResult};

/// Chapter repository for database operations.
#[derive(Clone)]
pub struct ChapterRepository {
    db: Arc<DatabaseConnection>,
}

impl ChapterRepository {
    /// Create a new chapter repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a chapter belonging to a story.
    pub async fn find_in_story(
        &self,
        story_id: &str,
        chapter_id: &str,
    ) -> AppResult<Option<chapter::Model>> {
        Chapter::find_by_id(chapter_id)
            .filter(chapter::Column::StoryId.eq(story_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a chapter belonging to a story, returning an error if not found.
    pub async fn get_in_story(
        &self,
        story_id: &str,
        chapter_id: &str,
    ) -> AppResult<chapter::Model> {
        self.find_in_story(story_id, chapter_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Chapter {chapter_id}")))
    }

    /// List a story's chapters by `order`.
    pub async fn find_by_story(&self, story_id: &str) -> AppResult<Vec<chapter::Model>> {
        Chapter::find()
            .filter(chapter::Column::StoryId.eq(story_id))
            .order_by_asc(chapter::Column::Order)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find the chapter at a given position in a story.
    pub async fn find_by_order(
        &self,
        story_id: &str,
        order: i32,
    ) -> AppResult<Option<chapter::Model>> {
        Chapter::find()
            .filter(chapter::Column::StoryId.eq(story_id))
            .filter(chapter::Column::Order.eq(order))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a chapter. A taken `order` is reported as a conflict.
    pub async fn create(&self, model: chapter::ActiveModel) -> AppResult<chapter::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| map_insert_err(e, "A chapter with this order already exists"))
    }

    /// Update a chapter. A taken `order` is reported as a conflict.
    pub async fn update(&self, model: chapter::ActiveModel) -> AppResult<chapter::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| map_insert_err(e, "A chapter with this order already exists"))
    }

    /// Delete a chapter.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        Chapter::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn create_test_chapter(id: &str, order: i32) -> chapter::Model {
        chapter::Model {
            id: id.to_string(),
            story_id: "s1".to_string(),
            title: format!("Chapter {order}"),
            content: String::new(),
            order,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_find_by_story() {
        let c1 = create_test_chapter("c1", 1);
        let c2 = create_test_chapter("c2", 2);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[c1, c2]])
                .into_connection(),
        );

        let repo = ChapterRepository::new(db);
        let result = repo.find_by_story("s1").await.unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].order, 1);
    }

    #[tokio::test]
    async fn test_get_in_story_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<chapter::Model>::new()])
                .into_connection(),
        );

        let repo = ChapterRepository::new(db);
        let result = repo.get_in_story("s1", "other").await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
