//! Decision point repository.

use std::sync::Arc;

use crate::entities::{DecisionPoint, decision_point};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
};
use storyloom_common::{AppError, AppResult};

/// Decision point repository for database operations.
///
/// Deactivation is not here; it goes through the voting engine.
#[derive(Clone)]
pub struct DecisionPointRepository {
    db: Arc<DatabaseConnection>,
}

impl DecisionPointRepository {
    /// Create a new decision point repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a decision point belonging to a chapter.
    pub async fn find_in_chapter(
        &self,
        chapter_id: &str,
        id: &str,
    ) -> AppResult<Option<decision_point::Model>> {
        DecisionPoint::find_by_id(id)
            .filter(decision_point::Column::ChapterId.eq(chapter_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a decision point belonging to a chapter, returning an error if not found.
    pub async fn get_in_chapter(
        &self,
        chapter_id: &str,
        id: &str,
    ) -> AppResult<decision_point::Model> {
        self.find_in_chapter(chapter_id, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Decision point {id}")))
    }

    /// List a chapter's active decision points, newest first.
    pub async fn find_active_by_chapter(
        &self,
        chapter_id: &str,
    ) -> AppResult<Vec<decision_point::Model>> {
        DecisionPoint::find()
            .filter(decision_point::Column::ChapterId.eq(chapter_id))
            .filter(decision_point::Column::IsActive.eq(true))
            .order_by_desc(decision_point::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a decision point.
    pub async fn create(
        &self,
        model: decision_point::ActiveModel,
    ) -> AppResult<decision_point::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a decision point.
    pub async fn update(
        &self,
        model: decision_point::ActiveModel,
    ) -> AppResult<decision_point::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a decision point.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        DecisionPoint::delete_by_id(id)
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

    fn create_test_decision_point(id: &str) -> decision_point::Model {
        decision_point::Model {
            id: id.to_string(),
            chapter_id: "c1".to_string(),
            question: "Which door?".to_string(),
            created_at: Utc::now().into(),
            expires_at: None,
            is_active: true,
        }
    }

    #[tokio::test]
    async fn test_find_active_by_chapter() {
        let dp = create_test_decision_point("dp1");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[dp]])
                .into_connection(),
        );

        let repo = DecisionPointRepository::new(db);
        let result = repo.find_active_by_chapter("c1").await.unwrap();

        assert_eq!(result.len(), 1);
        assert!(result[0].is_active);
    }

    #[tokio::test]
    async fn test_get_in_chapter_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<decision_point::Model>::new()])
                .into_connection(),
        );

        let repo = DecisionPointRepository::new(db);
        let result = repo.get_in_chapter("c1", "dp9").await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
